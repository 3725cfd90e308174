use crate::advisor::heuristic::heuristic_advice;
use crate::advisor::provider::AdviceRequest;
use crate::core::types::{AdviceResult, is_valid_sum};
use crate::strategy::types::StrategyId;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

const NO_REASONING: &str = "No reasoning provided.";

/// Which stage of the parser produced the advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Json,
    Fields,
    Heuristic,
}

/// Reads advice out of free text: first the outermost `{...}` block as
/// JSON, then the three fields by pattern, then the heuristic. Values are
/// validated at every stage, so a JSON block naming sum 13 falls through.
pub fn parse_advice(content: &str, request: &AdviceRequest) -> (AdviceResult, ParseStage) {
    if let Some(advice) = from_json_block(content) {
        return (advice, ParseStage::Json);
    }
    if let Some(advice) = from_fields(content) {
        debug!("Advice recovered field by field");
        return (advice, ParseStage::Fields);
    }
    warn!("Unparseable advice response, using heuristic");
    (heuristic_advice(request), ParseStage::Heuristic)
}

fn outermost_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn from_json_block(content: &str) -> Option<AdviceResult> {
    let block = outermost_block(content)?;
    let value: Value = serde_json::from_str(block).ok()?;

    let sum = match &value["recommended_sum"] {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    let sum = u8::try_from(sum).ok().filter(|s| is_valid_sum(*s))?;
    let strategy: StrategyId = value["recommended_strategy"].as_str()?.parse().ok()?;
    let reasoning = value["reasoning"].as_str().unwrap_or(NO_REASONING).to_string();

    Some(AdviceResult {
        recommended_sum: sum,
        recommended_strategy: strategy,
        reasoning,
    })
}

fn from_fields(content: &str) -> Option<AdviceResult> {
    lazy_static::lazy_static! {
        static ref SUM_RE: Regex =
            Regex::new(r#"recommended_sum["']?\s*:\s*["']?(\d+)"#).unwrap();
        static ref STRATEGY_RE: Regex =
            Regex::new(r#"recommended_strategy["']?\s*:\s*(?:"([^"]+)"|'([^']+)')"#).unwrap();
        static ref REASONING_RE: Regex =
            Regex::new(r#"reasoning["']?\s*:\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    }

    let sum: u8 = SUM_RE.captures(content)?.get(1)?.as_str().parse().ok()?;
    if !is_valid_sum(sum) {
        return None;
    }

    let caps = STRATEGY_RE.captures(content)?;
    let strategy: StrategyId = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;

    let reasoning = REASONING_RE
        .captures(content)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| NO_REASONING.to_string());

    Some(AdviceResult {
        recommended_sum: sum,
        recommended_strategy: strategy,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Trend;
    use crate::market::probability::adjust_probabilities;

    fn req() -> AdviceRequest {
        AdviceRequest::new(200.0, &[], Trend::Bull, adjust_probabilities(Trend::Bull, 0.2))
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let content = r#"Sure! Here is my advice:
```json
{
    "recommended_sum": 9,
    "recommended_strategy": "Kelly",
    "reasoning": "Bull market {favours} high sums"
}
```
Good luck."#;
        let (advice, stage) = parse_advice(content, &req());
        assert_eq!(stage, ParseStage::Json);
        assert_eq!(advice.recommended_sum, 9);
        assert_eq!(advice.recommended_strategy, StrategyId::Kelly);
        assert_eq!(advice.reasoning, "Bull market {favours} high sums");
    }

    #[test]
    fn test_string_sum_and_alias() {
        let content = r#"{"recommended_sum": "4", "recommended_strategy": "d'alembert"}"#;
        let (advice, stage) = parse_advice(content, &req());
        assert_eq!(stage, ParseStage::Json);
        assert_eq!(advice.recommended_sum, 4);
        assert_eq!(advice.recommended_strategy, StrategyId::Dalembert);
        assert_eq!(advice.reasoning, NO_REASONING);
    }

    #[test]
    fn test_field_extraction_when_json_is_broken() {
        let content = "recommended_sum: 11, recommended_strategy: 'fibonacci', \
                       reasoning: 'volatility favours the tails' (trailing comma ahead,}";
        let (advice, stage) = parse_advice(content, &req());
        assert_eq!(stage, ParseStage::Fields);
        assert_eq!(advice.recommended_sum, 11);
        assert_eq!(advice.recommended_strategy, StrategyId::Fibonacci);
        assert_eq!(advice.reasoning, "volatility favours the tails");
    }

    #[test]
    fn test_invalid_values_fall_through_to_heuristic() {
        let r = req();
        for content in [
            "",
            "I think you should bet on seven.",
            r#"{"recommended_sum": 13, "recommended_strategy": "kelly"}"#,
            r#"{"recommended_sum": 7, "recommended_strategy": "roulette"}"#,
            r#"{"recommended_sum": -2, "recommended_strategy": "fixed"}"#,
        ] {
            let (advice, stage) = parse_advice(content, &r);
            assert_eq!(stage, ParseStage::Heuristic, "{content}");
            assert_eq!(advice, heuristic_advice(&r));
        }
    }

    #[test]
    fn test_outermost_block() {
        assert_eq!(outermost_block("a {b {c} d} e"), Some("{b {c} d}"));
        assert_eq!(outermost_block("} nothing {"), None);
        assert_eq!(outermost_block("none"), None);
    }
}
