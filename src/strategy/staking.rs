//! The seven staking rules. Each one is a pure function of bankroll,
//! outcome history and its own parameters, and an empty history always
//! yields the base stake.

use crate::core::types::BetOutcome;
use crate::strategy::kelly::KellySizer;
use crate::strategy::streak::{trailing_losses, trailing_streak};
use crate::strategy::types::{Odds, StakeError, StakeParams, StrategyId};

const MIN_UNIT: f64 = 1.0;

pub fn fixed(bankroll: f64, amount: f64) -> f64 {
    amount.min(bankroll)
}

pub fn percentage(bankroll: f64, fraction: f64) -> f64 {
    (bankroll * fraction).max(MIN_UNIT).min(bankroll)
}

/// Like [`percentage`] but without the one-unit floor, so small bankrolls
/// produce sub-unit stakes.
pub fn masaniello(bankroll: f64, fraction: f64) -> f64 {
    bankroll * fraction.clamp(f64::MIN_POSITIVE, 1.0)
}

/// Doubles `base` for every consecutive loss at the end of the history.
pub fn martingale(bankroll: f64, history: &[BetOutcome], base: f64) -> f64 {
    let losses = trailing_losses(history);
    let exp = i32::try_from(losses).unwrap_or(i32::MAX);
    (base * 2f64.powi(exp)).min(bankroll)
}

/// Walks the 1, 1, 2, 3, 5, ... sequence one step per trailing loss; a win
/// resets the walk because the trailing-loss count drops to zero.
pub fn fibonacci(bankroll: f64, history: &[BetOutcome]) -> f64 {
    let index = trailing_losses(history);
    let (mut prev, mut cur) = (1.0_f64, 1.0_f64);
    for _ in 1..index {
        (prev, cur) = (cur, prev + cur);
        if cur >= bankroll {
            break;
        }
    }
    cur.min(bankroll)
}

/// `unit + streak` after a losing streak, `unit + streak - 1` (never below
/// `unit`) after a winning streak.
pub fn dalembert(bankroll: f64, history: &[BetOutcome], unit: f64) -> f64 {
    let stake = match trailing_streak(history) {
        None => unit,
        Some((BetOutcome::Win, n)) => (unit + n as f64 - 1.0).max(unit),
        Some((BetOutcome::Loss, n)) => unit + n as f64,
    };
    stake.min(bankroll)
}

pub fn kelly(bankroll: f64, odds: Odds, fraction: f64) -> f64 {
    KellySizer::new(fraction).stake(bankroll, odds)
}

/// Stake for the next bet under `strategy`.
///
/// Kelly without `odds` is a configuration error and is reported rather
/// than replaced by another rule.
pub fn compute_stake(
    strategy: StrategyId,
    bankroll: f64,
    history: &[BetOutcome],
    odds: Option<Odds>,
    params: &StakeParams,
) -> Result<f64, StakeError> {
    if !(bankroll > 0.0) {
        return Err(StakeError::InvalidBankroll(bankroll));
    }

    let stake = match strategy {
        StrategyId::Fixed => fixed(bankroll, params.fixed_amount),
        StrategyId::Percentage => percentage(bankroll, params.percentage),
        StrategyId::Masaniello => masaniello(bankroll, params.masaniello),
        StrategyId::Martingale => martingale(bankroll, history, params.martingale_base),
        StrategyId::Fibonacci => fibonacci(bankroll, history),
        StrategyId::Dalembert => dalembert(bankroll, history, params.dalembert_unit),
        StrategyId::Kelly => {
            let odds = odds.ok_or(StakeError::MissingOdds)?;
            kelly(bankroll, odds, params.kelly_fraction)
        }
    };
    Ok(stake)
}
