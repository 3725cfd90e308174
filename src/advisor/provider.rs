use crate::core::types::{AdviceResult, BetOutcome, Trend};
use crate::market::probability::ProbabilityDistribution;
use async_trait::async_trait;
use thiserror::Error;

pub const RECENT_OUTCOMES: usize = 10;

/// Everything an advisor is allowed to see about the session.
#[derive(Debug, Clone)]
pub struct AdviceRequest {
    pub bankroll: f64,
    /// At most [`RECENT_OUTCOMES`], most recent last.
    pub recent_outcomes: Vec<BetOutcome>,
    pub trend: Trend,
    pub probabilities: ProbabilityDistribution,
}

impl AdviceRequest {
    pub fn new(
        bankroll: f64,
        history: &[BetOutcome],
        trend: Trend,
        probabilities: ProbabilityDistribution,
    ) -> Self {
        let tail = &history[history.len().saturating_sub(RECENT_OUTCOMES)..];
        Self {
            bankroll,
            recent_outcomes: tail.to_vec(),
            trend,
            probabilities,
        }
    }
}

/// Reasons an external provider produced no advice. Any of these sends the
/// orchestrator on to the next tier.
#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("no api key configured")]
    MissingCredentials,
    #[error("advice call timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned no content")]
    EmptyResponse,
}

impl AdviceError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AdviceError::MissingCredentials => "missing_credentials",
            AdviceError::Timeout => "timeout",
            AdviceError::Transport(_) => "transport",
            AdviceError::EmptyResponse => "empty_response",
        }
    }
}

#[async_trait]
pub trait AdviceProvider: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResult, AdviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use BetOutcome::{Loss, Win};

    #[test]
    fn test_request_keeps_last_ten() {
        let mut history = vec![Loss; 15];
        history.push(Win);
        let req = AdviceRequest::new(80.0, &history, Trend::Bull, ProbabilityDistribution::fair());
        assert_eq!(req.recent_outcomes.len(), RECENT_OUTCOMES);
        assert_eq!(req.recent_outcomes.last(), Some(&Win));

        let short = AdviceRequest::new(80.0, &[Win], Trend::Bear, ProbabilityDistribution::fair());
        assert_eq!(short.recent_outcomes, vec![Win]);
    }
}
