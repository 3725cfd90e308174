use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyId {
    Fixed,
    Percentage,
    Masaniello,
    Martingale,
    Fibonacci,
    Dalembert,
    Kelly,
}

impl StrategyId {
    pub const ALL: [StrategyId; 7] = [
        StrategyId::Masaniello,
        StrategyId::Martingale,
        StrategyId::Fibonacci,
        StrategyId::Dalembert,
        StrategyId::Percentage,
        StrategyId::Kelly,
        StrategyId::Fixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Fixed => "fixed",
            StrategyId::Percentage => "percentage",
            StrategyId::Masaniello => "masaniello",
            StrategyId::Martingale => "martingale",
            StrategyId::Fibonacci => "fibonacci",
            StrategyId::Dalembert => "dalembert",
            StrategyId::Kelly => "kelly",
        }
    }

    /// One-line description, used in advice prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            StrategyId::Fixed => "Uses a fixed stake amount",
            StrategyId::Percentage => "Bets a fixed percentage of bankroll",
            StrategyId::Masaniello => "Adjusts stake based on bankroll",
            StrategyId::Martingale => "Doubles stake after each loss",
            StrategyId::Fibonacci => "Uses Fibonacci sequence for stakes",
            StrategyId::Dalembert => {
                "Increases stake by 1 unit after loss, decreases by 1 after win"
            }
            StrategyId::Kelly => "Uses Kelly Criterion for optimal bet sizing",
        }
    }

    /// Only kelly needs the win probability and payout of the bet.
    pub fn needs_odds(&self) -> bool {
        matches!(self, StrategyId::Kelly)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyId {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(StrategyId::Fixed),
            "percentage" => Ok(StrategyId::Percentage),
            "masaniello" => Ok(StrategyId::Masaniello),
            "martingale" => Ok(StrategyId::Martingale),
            "fibonacci" => Ok(StrategyId::Fibonacci),
            "dalembert" | "d'alembert" => Ok(StrategyId::Dalembert),
            "kelly" => Ok(StrategyId::Kelly),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

impl Serialize for StrategyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StrategyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Win probability and gross payout multiplier of the bet being sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Odds {
    pub probability: f64,
    pub payout: f64,
}

/// Tunables for every strategy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StakeParams {
    #[serde(rename = "fixedAmount", default = "default_fixed_amount")]
    pub fixed_amount: f64,
    #[serde(default = "default_fraction")]
    pub percentage: f64,
    #[serde(default = "default_fraction")]
    pub masaniello: f64,
    #[serde(rename = "martingaleBase", default = "default_unit")]
    pub martingale_base: f64,
    #[serde(rename = "dalembertUnit", default = "default_unit")]
    pub dalembert_unit: f64,
    #[serde(rename = "kellyFraction", default = "default_kelly_fraction")]
    pub kelly_fraction: f64,
}

impl Default for StakeParams {
    fn default() -> Self {
        Self {
            fixed_amount: default_fixed_amount(),
            percentage: default_fraction(),
            masaniello: default_fraction(),
            martingale_base: default_unit(),
            dalembert_unit: default_unit(),
            kelly_fraction: default_kelly_fraction(),
        }
    }
}

fn default_fixed_amount() -> f64 {
    5.0
}
fn default_fraction() -> f64 {
    0.05
}
fn default_unit() -> f64 {
    1.0
}
fn default_kelly_fraction() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StakeError {
    #[error("bankroll must be positive, got {0}")]
    InvalidBankroll(f64),
    #[error("kelly sizing requires win probability and payout")]
    MissingOdds,
}
