use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;

use crate::core::types::{MAX_SUM, MIN_SUM, SUMS, Trend};

const SLOTS: usize = (MAX_SUM - MIN_SUM + 1) as usize;
const TREND_BOOST: f64 = 1.5;
const VOLATILITY_THRESHOLD: f64 = 0.3;
const EXTREME_SUMS: [u8; 4] = [2, 3, 11, 12];

/// Probability of each two-dice sum, indexed 2..=12.
///
/// Values handed out by [`adjust_probabilities`] are always normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityDistribution {
    probs: [f64; SLOTS],
}

impl ProbabilityDistribution {
    /// True distribution of the sum of two fair six-sided dice.
    pub fn fair() -> Self {
        let mut probs = [0.0; SLOTS];
        for s in SUMS {
            probs[slot(s)] = (6 - (7 - s as i32).abs()) as f64 / 36.0;
        }
        Self { probs }
    }

    /// Probability of `sum`; 0.0 outside 2..=12.
    pub fn get(&self, sum: u8) -> f64 {
        if SUMS.contains(&sum) {
            self.probs[slot(sum)]
        } else {
            0.0
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        SUMS.map(move |s| (s, self.probs[slot(s)]))
    }

    pub fn total(&self) -> f64 {
        self.probs.iter().sum()
    }

    fn scale(&mut self, sum: u8, factor: f64) {
        self.probs[slot(sum)] *= factor;
    }

    fn normalize(&mut self) {
        let total = self.total();
        for p in self.probs.iter_mut() {
            *p /= total;
        }
    }
}

fn slot(sum: u8) -> usize {
    (sum - MIN_SUM) as usize
}

impl Serialize for ProbabilityDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SLOTS))?;
        for (s, p) in self.iter() {
            map.serialize_entry(&s, &p)?;
        }
        map.end()
    }
}

/// Biases the fair distribution by market regime and volatility.
///
/// BULL boosts 7..=12, BEAR boosts 2..=6, and volatility above 0.3 inflates
/// the extreme sums {2, 3, 11, 12} by `1 + volatility`. The result is
/// re-normalised. Out-of-range volatility is clamped to [0, 1] first and a
/// NaN volatility is treated as 0.
pub fn adjust_probabilities(trend: Trend, volatility: f64) -> ProbabilityDistribution {
    let volatility = if volatility.is_nan() {
        0.0
    } else {
        volatility.clamp(0.0, 1.0)
    };

    let mut dist = ProbabilityDistribution::fair();

    let boosted = match trend {
        Trend::Bull => 7..=12,
        Trend::Bear => 2..=6,
    };
    for s in boosted {
        dist.scale(s, TREND_BOOST);
    }

    if volatility > VOLATILITY_THRESHOLD {
        for s in EXTREME_SUMS {
            dist.scale(s, 1.0 + volatility);
        }
    }

    dist.normalize();
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fair_distribution_matches_two_dice() {
        let d = ProbabilityDistribution::fair();
        assert!((d.get(7) - 6.0 / 36.0).abs() < 1e-12);
        assert!((d.get(2) - 1.0 / 36.0).abs() < 1e-12);
        assert!((d.get(12) - 1.0 / 36.0).abs() < 1e-12);
        assert!((d.total() - 1.0).abs() < 1e-12);
        assert_eq!(d.get(1), 0.0);
        assert_eq!(d.get(13), 0.0);
    }

    #[test]
    fn test_adjusted_distribution_always_normalised() {
        for trend in [Trend::Bull, Trend::Bear] {
            for step in 0..=100 {
                let vol = step as f64 / 100.0;
                let d = adjust_probabilities(trend, vol);
                assert!((d.total() - 1.0).abs() < 1e-9, "{trend} vol={vol}");
                assert!(d.iter().all(|(_, p)| p > 0.0 && p < 1.0));
            }
        }
    }

    #[test]
    fn test_bull_favours_high_sums() {
        let bull = adjust_probabilities(Trend::Bull, 0.1);
        let bear = adjust_probabilities(Trend::Bear, 0.1);
        // 6 and 8 are symmetric in the fair distribution
        assert!(bull.get(8) > bull.get(6));
        assert!(bear.get(6) > bear.get(8));
    }

    #[test]
    fn test_volatility_below_threshold_has_no_effect() {
        let calm = adjust_probabilities(Trend::Bull, 0.0);
        let mild = adjust_probabilities(Trend::Bull, 0.3);
        assert_eq!(calm, mild);

        let wild = adjust_probabilities(Trend::Bull, 0.9);
        assert!(wild.get(2) > calm.get(2));
        assert!(wild.get(7) < calm.get(7));
    }

    #[test]
    fn test_out_of_range_volatility_is_clamped() {
        assert_eq!(
            adjust_probabilities(Trend::Bear, 5.0),
            adjust_probabilities(Trend::Bear, 1.0)
        );
        assert_eq!(
            adjust_probabilities(Trend::Bear, -2.0),
            adjust_probabilities(Trend::Bear, 0.0)
        );
        let nan = adjust_probabilities(Trend::Bear, f64::NAN);
        assert!((nan.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bull_weights_by_hand() {
        // weights: 1,2,3,4,5 for 2..6 and 1.5 * (6,5,4,3,2,1) for 7..12
        let d = adjust_probabilities(Trend::Bull, 0.0);
        let total = 15.0 + 1.5 * 21.0;
        assert!((d.get(7) - 9.0 / total).abs() < 1e-12);
        assert!((d.get(2) - 1.0 / total).abs() < 1e-12);
    }
}
