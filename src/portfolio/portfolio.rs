use crate::core::types::{PositionView, is_valid_sum};
use crate::market::payout::PayoutTable;
use crate::market::probability::ProbabilityDistribution;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const MAX_POSITIONS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settlement {
    pub profit_loss: f64,
    /// (sum, gross payout) for every position that matched the roll.
    pub winning_positions: Vec<(u8, f64)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub expected_return: f64,
    pub max_loss: f64,
    pub max_gain: f64,
    pub win_probability: f64,
}

/// Bets on distinct sums, keyed by sum. Adding to a held sum accumulates.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    positions: BTreeMap<u8, f64>, // sum -> amount
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` on `sum`. Returns false without touching the portfolio
    /// when a new sum would exceed [`MAX_POSITIONS`], or for a sum outside
    /// 2..=12 or a non-positive amount.
    pub fn add_position(&mut self, sum: u8, amount: f64) -> bool {
        if !is_valid_sum(sum) || !(amount > 0.0) {
            debug!(sum, amount, "Rejected invalid position");
            return false;
        }
        if let Some(held) = self.positions.get_mut(&sum) {
            *held += amount;
            return true;
        }
        if self.positions.len() >= MAX_POSITIONS {
            return false;
        }
        self.positions.insert(sum, amount);
        true
    }

    /// Removes the position on `sum`, returning its amount (0.0 if absent).
    pub fn remove_position(&mut self, sum: u8) -> f64 {
        self.positions.remove(&sum).unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn amount(&self, sum: u8) -> f64 {
        self.positions.get(&sum).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.positions.iter().map(|(&s, &a)| (s, a))
    }

    pub fn total_invested(&self) -> f64 {
        self.positions.values().sum()
    }

    /// Sum carrying the largest stake; ties go to the lowest sum.
    pub fn primary_sum(&self) -> Option<u8> {
        self.iter()
            .fold(None, |best: Option<(u8, f64)>, (s, a)| match best {
                Some((_, b)) if b >= a => best,
                _ => Some((s, a)),
            })
            .map(|(s, _)| s)
    }

    pub fn view(&self) -> Vec<PositionView> {
        self.iter()
            .map(|(sum, amount)| PositionView { sum, amount })
            .collect()
    }

    /// Matching positions are credited `amount * payout`, all others lose
    /// their amount.
    pub fn settle(&self, dice_sum: u8, payouts: &PayoutTable) -> Settlement {
        let mut settlement = Settlement::default();
        for (sum, amount) in self.iter() {
            if sum == dice_sum {
                let gross = amount * payouts.payout(sum);
                settlement.profit_loss += gross;
                settlement.winning_positions.push((sum, gross));
            } else {
                settlement.profit_loss -= amount;
            }
        }
        settlement
    }

    /// Positions sit on mutually exclusive outcomes, so at most one can hit
    /// per roll: the worst case loses everything and the win probability is
    /// one minus the chance that none of the held sums is rolled.
    pub fn risk_metrics(
        &self,
        probabilities: &ProbabilityDistribution,
        payouts: &PayoutTable,
    ) -> RiskMetrics {
        if self.is_empty() {
            return RiskMetrics::default();
        }

        let mut metrics = RiskMetrics {
            max_loss: -self.total_invested(),
            ..Default::default()
        };
        let mut p_none = 1.0;
        for (sum, amount) in self.iter() {
            let p = probabilities.get(sum);
            let payout = payouts.payout(sum);
            metrics.expected_return += p * amount * payout - (1.0 - p) * amount;
            metrics.max_gain += amount * (payout - 1.0);
            p_none *= 1.0 - p;
        }
        metrics.win_probability = 1.0 - p_none;
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Trend;
    use crate::market::probability::adjust_probabilities;

    #[test]
    fn test_settle_reference_case() {
        let mut p = Portfolio::new();
        assert!(p.add_position(7, 10.0));
        assert!(p.add_position(8, 5.0));

        let s = p.settle(7, &PayoutTable::new());
        assert!((s.profit_loss - 55.0).abs() < 1e-9);
        assert_eq!(s.winning_positions, vec![(7, 60.0)]);

        let miss = p.settle(2, &PayoutTable::new());
        assert!((miss.profit_loss + 15.0).abs() < 1e-9);
        assert!(miss.winning_positions.is_empty());
    }

    #[test]
    fn test_capacity_limit() {
        let mut p = Portfolio::new();
        for sum in 2..=6 {
            assert!(p.add_position(sum, 1.0));
        }
        assert!(!p.add_position(9, 1.0));
        assert_eq!(p.len(), MAX_POSITIONS);
        assert_eq!(p.amount(9), 0.0);
        assert!((p.total_invested() - 5.0).abs() < 1e-12);

        // topping up a held sum is still allowed when full
        assert!(p.add_position(4, 2.0));
        assert_eq!(p.amount(4), 3.0);
    }

    #[test]
    fn test_add_merges_and_remove_returns_amount() {
        let mut p = Portfolio::new();
        p.add_position(10, 2.5);
        p.add_position(10, 1.5);
        assert_eq!(p.len(), 1);
        assert_eq!(p.remove_position(10), 4.0);
        assert_eq!(p.remove_position(10), 0.0);
        assert!(p.is_empty());
    }

    #[test]
    fn test_invalid_positions_rejected() {
        let mut p = Portfolio::new();
        assert!(!p.add_position(1, 5.0));
        assert!(!p.add_position(13, 5.0));
        assert!(!p.add_position(7, 0.0));
        assert!(!p.add_position(7, -3.0));
        assert!(p.is_empty());
    }

    #[test]
    fn test_primary_sum_prefers_largest_stake() {
        let mut p = Portfolio::new();
        assert_eq!(p.primary_sum(), None);
        p.add_position(5, 2.0);
        p.add_position(9, 6.0);
        p.add_position(11, 6.0);
        assert_eq!(p.primary_sum(), Some(9));
    }

    #[test]
    fn test_risk_metrics() {
        let probs = adjust_probabilities(Trend::Bull, 0.1);
        let payouts = PayoutTable::new();

        assert_eq!(Portfolio::new().risk_metrics(&probs, &payouts), RiskMetrics::default());

        let mut p = Portfolio::new();
        p.add_position(7, 10.0);
        p.add_position(8, 5.0);
        let m = p.risk_metrics(&probs, &payouts);

        let (p7, p8) = (probs.get(7), probs.get(8));
        let expected = p7 * 60.0 - (1.0 - p7) * 10.0 + p8 * 35.0 - (1.0 - p8) * 5.0;
        assert!((m.expected_return - expected).abs() < 1e-9);
        assert_eq!(m.max_loss, -15.0);
        assert_eq!(m.max_gain, 10.0 * 5.0 + 5.0 * 6.0);
        assert!((m.win_probability - (1.0 - (1.0 - p7) * (1.0 - p8))).abs() < 1e-12);
    }

    #[test]
    fn test_clear_empties() {
        let mut p = Portfolio::new();
        p.add_position(3, 1.0);
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.total_invested(), 0.0);
    }
}
