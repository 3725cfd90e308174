use crate::strategy::types::{StakeError, UnknownStrategy};
use thiserror::Error;

/// Rejections of user-level commands. None of these change session state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("invalid bet sum {0}, must be between 2 and 12")]
    InvalidSum(u8),
    #[error("bet amount must be positive, got {0}")]
    NonPositiveAmount(f64),
    #[error("not enough available funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },
    #[error("portfolio already holds the maximum number of positions")]
    PortfolioFull,
    #[error("no positions to play")]
    NoPositions,
    #[error("bankroll exhausted")]
    Bankrupt,
    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategy),
    #[error(transparent)]
    Stake(#[from] StakeError),
}
