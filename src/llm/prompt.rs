use crate::advisor::provider::AdviceRequest;
use crate::strategy::streak::recent_win_rate;
use crate::strategy::types::StrategyId;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are an AI strategy advisor for a dice betting game.";

pub fn build_prompt(req: &AdviceRequest) -> String {
    let recent = if req.recent_outcomes.is_empty() {
        "No history yet".to_string()
    } else {
        req.recent_outcomes
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let win_rate = recent_win_rate(&req.recent_outcomes, req.recent_outcomes.len());

    let mut prompt = format!(
        "As an AI strategy advisor for a dice betting game, analyze the current game state and recommend a betting strategy.

Current Game State:
- Bankroll: ${:.2}
- Market Trend: {}
- Recent Results: {}
- Win Rate: {:.2}%

Current Probabilities:
",
        req.bankroll,
        req.trend.as_str().to_uppercase(),
        recent,
        win_rate * 100.0
    );

    for (sum, p) in req.probabilities.iter() {
        let _ = writeln!(prompt, "- Sum {}: {:.2}%", sum, p * 100.0);
    }

    prompt.push_str("\nAvailable Strategies:\n");
    for id in StrategyId::ALL {
        let _ = writeln!(prompt, "- {}: {}", id, id.describe());
    }

    prompt.push_str(
        r#"
Please provide:
1. Recommended sum to bet on (2-12)
2. Recommended betting strategy
3. Brief reasoning for your recommendation

Format your response as JSON:
{
    "recommended_sum": 7,
    "recommended_strategy": "masaniello",
    "reasoning": "Your reasoning here"
}
"#,
    );
    prompt
}
