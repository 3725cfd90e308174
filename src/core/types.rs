use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

use crate::market::probability::ProbabilityDistribution;
use crate::strategy::types::StrategyId;

pub const MIN_SUM: u8 = 2;
pub const MAX_SUM: u8 = 12;
pub const SUMS: RangeInclusive<u8> = MIN_SUM..=MAX_SUM;

pub fn is_valid_sum(sum: u8) -> bool {
    SUMS.contains(&sum)
}

// ----------- Market regime -----------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bull,
    Bear,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bull => "bull",
            Trend::Bear => "bear",
        }
    }

    pub fn parse(s: &str) -> Option<Trend> {
        match s {
            "bull" => Some(Trend::Bull),
            "bear" => Some(Trend::Bear),
            _ => None,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Trend {
        if rng.random_bool(0.5) {
            Trend::Bull
        } else {
            Trend::Bear
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------- Round outcome tags -----------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Loss,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Win => "win",
            BetOutcome::Loss => "loss",
        }
    }

    pub fn parse(s: &str) -> Option<BetOutcome> {
        match s {
            "win" => Some(BetOutcome::Win),
            "loss" => Some(BetOutcome::Loss),
            _ => None,
        }
    }
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub die1: u8,
    pub die2: u8,
    pub sum: u8,
}

pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R) -> DiceRoll {
    let die1 = rng.random_range(1..=6);
    let die2 = rng.random_range(1..=6);
    DiceRoll {
        die1,
        die2,
        sum: die1 + die2,
    }
}

// ----------- Advice -----------------
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdviceResult {
    pub recommended_sum: u8,
    pub recommended_strategy: StrategyId,
    pub reasoning: String,
}

// ----------- Snapshots handed to the presentation layer -----------------
#[derive(Clone, Debug, Serialize)]
pub struct PositionView {
    pub sum: u8,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    pub bankroll: f64,
    pub history: Vec<BetOutcome>,
    pub trend: Trend,
    pub volatility: f64,
    pub round_count: u64,
    pub probabilities: ProbabilityDistribution,
    pub strategy: StrategyId,
    pub portfolio: Vec<PositionView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundResult {
    pub dice: DiceRoll,
    pub profit_loss: f64,
    pub new_bankroll: f64,
    pub outcome: BetOutcome,
    pub winning_positions: Vec<(u8, f64)>,
    pub trend_changed: bool,
    pub trend: Trend,
    pub news: String,
}
