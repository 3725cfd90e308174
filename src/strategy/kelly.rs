use crate::strategy::types::Odds;

/// Fraction of bankroll used when the bet has no positive edge.
const FLOOR_FRACTION: f64 = 0.01;
const MIN_STAKE: f64 = 1.0;

pub struct KellySizer {
    kelly_multiplier: f64,
}

impl Default for KellySizer {
    fn default() -> Self {
        Self {
            kelly_multiplier: 0.5,
        }
    }
}

impl KellySizer {
    pub fn new(kelly_multiplier: f64) -> Self {
        Self { kelly_multiplier }
    }

    /// Scaled Kelly fraction of bankroll for one bet.
    ///
    /// Formula: f = (b*p - q) / b with b = payout - 1, q = 1 - p.
    /// When b*p <= q (no edge, or a payout that doesn't beat the stake) the
    /// nominal 1% floor is used instead. Either way the multiplier applies.
    pub fn fraction(&self, odds: Odds) -> f64 {
        let b = odds.payout - 1.0;
        let p = odds.probability.clamp(0.0, 1.0);
        let q = 1.0 - p;

        let raw_kelly = if b > 0.0 && b * p > q {
            (b * p - q) / b
        } else {
            FLOOR_FRACTION
        };

        raw_kelly * self.kelly_multiplier
    }

    /// Stake for `bankroll`: at least 1 unit, never more than the bankroll.
    pub fn stake(&self, bankroll: f64, odds: Odds) -> f64 {
        (bankroll * self.fraction(odds)).max(MIN_STAKE).min(bankroll)
    }
}
