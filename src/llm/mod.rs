pub mod client;
pub mod openrouter;
pub mod parse;
pub mod prompt;

use crate::advisor::provider::{AdviceError, AdviceRequest};
use crate::core::types::AdviceResult;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use parse::{ParseStage, parse_advice};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

pub type Limiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub fn limiter(rate_limit_rpm: u32) -> Limiter {
    let rpm = NonZeroU32::new(rate_limit_rpm).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(rpm)))
}

/// Turns raw completion text into advice. Blank content is an error; text
/// that merely fails to parse degrades to the heuristic inside the parser.
pub fn advice_from_content(
    provider: &str,
    content: Option<&str>,
    request: &AdviceRequest,
) -> Result<AdviceResult, AdviceError> {
    let content = content
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(AdviceError::EmptyResponse)?;

    let (advice, stage) = parse_advice(content, request);
    if stage == ParseStage::Heuristic {
        warn!(provider, "Provider answer unusable, degraded to heuristic");
        metrics::counter!("advice_parse_fallback_total", "provider" => provider.to_string())
            .increment(1);
    }
    Ok(advice)
}
