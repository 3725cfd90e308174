use crate::advisor::orchestrator::{AdvisoryOrchestrator, Recommendation};
use crate::advisor::provider::AdviceRequest;
use crate::analytics::tracker::{AnalyticsSummary, PerformanceTracker, RoundRecord};
use crate::config::config::AppCfg;
use crate::core::types::{BetOutcome, GameState, RoundResult, is_valid_sum, roll_dice};
use crate::game::error::GameError;
use crate::market::payout::PayoutTable;
use crate::market::simulator::MarketSimulator;
use crate::portfolio::portfolio::{Portfolio, RiskMetrics};
use crate::rl::state::encode_state;
use crate::strategy::staking::compute_stake;
use crate::strategy::types::{Odds, StakeParams, StrategyId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

/// One player's game: bankroll, history, market, portfolio and advisor.
pub struct GameSession {
    bankroll: f64,
    history: Vec<BetOutcome>,
    market: MarketSimulator,
    portfolio: Portfolio,
    payouts: PayoutTable,
    strategy: StrategyId,
    stakes: StakeParams,
    analytics: PerformanceTracker,
    advisor: AdvisoryOrchestrator,
    rng: StdRng,
    round_count: u64,
}

impl GameSession {
    pub fn new(cfg: &AppCfg, advisor: AdvisoryOrchestrator) -> Result<Self, GameError> {
        let strategy: StrategyId = cfg.game.strategy.parse()?;
        let seed = cfg.game.seed;
        let rng = match seed {
            // market and dice draw from separate streams
            Some(s) => StdRng::seed_from_u64(s.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            bankroll: cfg.game.initial_bankroll,
            history: Vec::new(),
            market: MarketSimulator::new(cfg.market.clone(), seed),
            portfolio: Portfolio::new(),
            payouts: PayoutTable::new(),
            strategy,
            stakes: cfg.stakes.clone(),
            analytics: PerformanceTracker::new(cfg.game.initial_bankroll),
            advisor,
            rng,
            round_count: 0,
        })
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    pub fn history(&self) -> &[BetOutcome] {
        &self.history
    }

    pub fn round_count(&self) -> u64 {
        self.round_count
    }

    pub fn strategy(&self) -> StrategyId {
        self.strategy
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn advisor(&self) -> &AdvisoryOrchestrator {
        &self.advisor
    }

    pub fn is_bankrupt(&self) -> bool {
        !(self.bankroll > 0.0)
    }

    fn ensure_solvent(&self) -> Result<(), GameError> {
        if self.is_bankrupt() {
            return Err(GameError::Bankrupt);
        }
        Ok(())
    }

    fn validate_bet(sum: u8, amount: f64) -> Result<(), GameError> {
        if !is_valid_sum(sum) {
            return Err(GameError::InvalidSum(sum));
        }
        if !(amount > 0.0) {
            return Err(GameError::NonPositiveAmount(amount));
        }
        Ok(())
    }

    /// Single-bet mode: replaces the portfolio with one position and plays
    /// the round.
    pub fn place_bet(&mut self, sum: u8, amount: f64) -> Result<RoundResult, GameError> {
        self.ensure_solvent()?;
        Self::validate_bet(sum, amount)?;
        if amount > self.bankroll {
            return Err(GameError::InsufficientFunds {
                requested: amount,
                available: self.bankroll,
            });
        }
        self.portfolio.clear();
        self.portfolio.add_position(sum, amount);
        self.play_round()
    }

    /// Multi-bet mode. The amount must fit in what the portfolio has not
    /// already committed.
    pub fn add_position(&mut self, sum: u8, amount: f64) -> Result<(), GameError> {
        self.ensure_solvent()?;
        Self::validate_bet(sum, amount)?;
        let available = self.bankroll - self.portfolio.total_invested();
        if amount > available {
            return Err(GameError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        if !self.portfolio.add_position(sum, amount) {
            return Err(GameError::PortfolioFull);
        }
        Ok(())
    }

    /// Risk of the current portfolio under this round's probabilities.
    pub fn risk_metrics(&self) -> RiskMetrics {
        self.portfolio
            .risk_metrics(&self.market.probabilities(), &self.payouts)
    }

    pub fn remove_position(&mut self, sum: u8) -> f64 {
        self.portfolio.remove_position(sum)
    }

    pub fn clear_portfolio(&mut self) {
        self.portfolio.clear();
    }

    pub fn set_strategy(&mut self, name: &str) -> Result<StrategyId, GameError> {
        let strategy: StrategyId = name.parse()?;
        if strategy != self.strategy {
            info!(from = %self.strategy, to = %strategy, "Strategy changed");
        }
        self.strategy = strategy;
        Ok(strategy)
    }

    /// Stake the active strategy proposes for a bet on `sum`.
    pub fn strategy_stake(&self, sum: u8) -> Result<f64, GameError> {
        if !is_valid_sum(sum) {
            return Err(GameError::InvalidSum(sum));
        }
        let odds = Odds {
            probability: self.market.probabilities().get(sum),
            payout: self.payouts.payout(sum),
        };
        Ok(compute_stake(
            self.strategy,
            self.bankroll,
            &self.history,
            Some(odds),
            &self.stakes,
        )?)
    }

    pub async fn recommend(&mut self) -> Result<Recommendation, GameError> {
        self.ensure_solvent()?;
        let request = AdviceRequest::new(
            self.bankroll,
            &self.history,
            self.market.trend(),
            self.market.probabilities(),
        );
        Ok(self
            .advisor
            .recommend(&request, &self.history, &mut self.rng)
            .await)
    }

    /// Bets the recommended stake on the recommended sum and, once the round
    /// is played, adopts the recommended strategy. A rejected bet leaves the
    /// active strategy alone.
    pub fn play_recommendation(&mut self, rec: &Recommendation) -> Result<RoundResult, GameError> {
        let stake = rec.stake.min(self.bankroll);
        let result = self.place_bet(rec.advice.recommended_sum, stake)?;
        self.set_strategy(rec.advice.recommended_strategy.as_str())?;
        Ok(result)
    }

    /// Rolls and settles the current portfolio, then feeds the outcome to
    /// the analytics, the learner and the market, in that order.
    pub fn play_round(&mut self) -> Result<RoundResult, GameError> {
        self.ensure_solvent()?;
        let primary_sum = self.portfolio.primary_sum().ok_or(GameError::NoPositions)?;

        let trend_played = self.market.trend();
        let state_before = encode_state(self.bankroll, &self.history, trend_played);
        let stake = self.portfolio.total_invested();

        let dice = roll_dice(&mut self.rng);
        let settlement = self.portfolio.settle(dice.sum, &self.payouts);
        let net = settlement.profit_loss;
        // positions never exceed the bankroll, so this only absorbs rounding
        self.bankroll = (self.bankroll + net).max(0.0);

        let outcome = if net > 0.0 {
            BetOutcome::Win
        } else {
            BetOutcome::Loss
        };
        self.history.push(outcome);
        self.round_count += 1;

        self.analytics.record(RoundRecord {
            bankroll: self.bankroll,
            win: outcome == BetOutcome::Win,
            stake,
            bet_sum: primary_sum,
            dice_result: dice.sum,
            trend: trend_played,
        });

        let (trend, trend_changed) = self.market.update(dice.sum);
        let state_after = encode_state(self.bankroll, &self.history, trend);
        self.advisor.learn(&state_before, primary_sum, net, &state_after);

        self.portfolio.clear();
        let news = self.market.news().to_string();

        metrics::counter!("rounds_total", "result" => outcome.as_str()).increment(1);
        metrics::gauge!("bankroll").set(self.bankroll);
        info!(
            round = self.round_count,
            dice = dice.sum,
            %outcome,
            profit_loss = net,
            bankroll = self.bankroll,
            %trend,
            trend_changed,
            "Round settled"
        );

        Ok(RoundResult {
            dice,
            profit_loss: net,
            new_bankroll: self.bankroll,
            outcome,
            winning_positions: settlement.winning_positions,
            trend_changed,
            trend,
            news,
        })
    }

    pub fn state(&self) -> GameState {
        GameState {
            bankroll: self.bankroll,
            history: self.history.clone(),
            trend: self.market.trend(),
            volatility: self.market.volatility(),
            round_count: self.round_count,
            probabilities: self.market.probabilities(),
            strategy: self.strategy,
            portfolio: self.portfolio.view(),
        }
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        self.analytics.summary()
    }
}
