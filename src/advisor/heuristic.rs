//! Deterministic advice used when nothing better is available.

use crate::core::types::{AdviceResult, Trend};
use crate::market::payout::PayoutTable;
use crate::market::probability::ProbabilityDistribution;
use crate::rl::state::BankrollBracket;
use crate::strategy::types::StrategyId;

use super::provider::AdviceRequest;

/// Sum with the highest probability x payout. Ties keep the lowest sum.
pub fn best_expected_sum(probabilities: &ProbabilityDistribution, payouts: &PayoutTable) -> u8 {
    probabilities
        .iter()
        .fold((7, f64::NEG_INFINITY), |(best, best_ev), (sum, p)| {
            let ev = p * payouts.payout(sum);
            if ev > best_ev { (sum, ev) } else { (best, best_ev) }
        })
        .0
}

/// Strategy by bankroll tier only.
pub fn tier_strategy(bankroll: f64) -> StrategyId {
    match BankrollBracket::of(bankroll) {
        BankrollBracket::Low => StrategyId::Percentage,
        BankrollBracket::Medium => StrategyId::Masaniello,
        BankrollBracket::High => StrategyId::Kelly,
    }
}

/// Strategy paired with a locally learned sum.
pub fn local_strategy(bankroll: f64, trend: Trend) -> StrategyId {
    match (BankrollBracket::of(bankroll), trend) {
        (BankrollBracket::Low, _) => StrategyId::Percentage,
        (BankrollBracket::Medium, Trend::Bull) => StrategyId::Masaniello,
        (BankrollBracket::Medium, Trend::Bear) => StrategyId::Dalembert,
        (BankrollBracket::High, Trend::Bull) => StrategyId::Kelly,
        (BankrollBracket::High, Trend::Bear) => StrategyId::Masaniello,
    }
}

pub fn heuristic_advice(request: &AdviceRequest) -> AdviceResult {
    let sum = best_expected_sum(&request.probabilities, &PayoutTable::new());
    let strategy = tier_strategy(request.bankroll);
    let reasoning = match BankrollBracket::of(request.bankroll) {
        BankrollBracket::Low => "Low bankroll detected. Using percentage strategy to preserve capital.",
        BankrollBracket::Medium => "Medium bankroll detected. Using masaniello for balanced risk.",
        BankrollBracket::High => "High bankroll detected. Using kelly criterion for optimal growth.",
    };
    AdviceResult {
        recommended_sum: sum,
        recommended_strategy: strategy,
        reasoning: format!("Highest expected value on sum {sum}. {reasoning}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::probability::adjust_probabilities;

    #[test]
    fn test_best_expected_sum_on_fair_dice() {
        // p * payout is 1.0 for every sum but 6 and 8 (35/36)
        let sum = best_expected_sum(&ProbabilityDistribution::fair(), &PayoutTable::new());
        assert!((2..=12).contains(&sum));
        let ev = |s: u8| ProbabilityDistribution::fair().get(s) * PayoutTable::new().payout(s);
        for s in 2..=12 {
            assert!(ev(sum) + 1e-12 >= ev(s));
        }
    }

    #[test]
    fn test_best_expected_sum_follows_trend() {
        let bull = best_expected_sum(&adjust_probabilities(Trend::Bull, 0.1), &PayoutTable::new());
        assert!(bull >= 7);
        let bear = best_expected_sum(&adjust_probabilities(Trend::Bear, 0.1), &PayoutTable::new());
        assert!(bear <= 6);
    }

    #[test]
    fn test_tier_and_local_strategies() {
        assert_eq!(tier_strategy(10.0), StrategyId::Percentage);
        assert_eq!(tier_strategy(100.0), StrategyId::Masaniello);
        assert_eq!(tier_strategy(1000.0), StrategyId::Kelly);

        assert_eq!(local_strategy(10.0, Trend::Bull), StrategyId::Percentage);
        assert_eq!(local_strategy(10.0, Trend::Bear), StrategyId::Percentage);
        assert_eq!(local_strategy(100.0, Trend::Bull), StrategyId::Masaniello);
        assert_eq!(local_strategy(100.0, Trend::Bear), StrategyId::Dalembert);
        assert_eq!(local_strategy(200.0, Trend::Bull), StrategyId::Kelly);
        assert_eq!(local_strategy(200.0, Trend::Bear), StrategyId::Masaniello);
    }

    #[test]
    fn test_heuristic_advice() {
        let req = AdviceRequest::new(20.0, &[], Trend::Bear, adjust_probabilities(Trend::Bear, 0.0));
        let advice = heuristic_advice(&req);
        assert_eq!(advice.recommended_strategy, StrategyId::Percentage);
        assert!(advice.recommended_sum <= 6);
        assert!(!advice.reasoning.is_empty());
    }
}
