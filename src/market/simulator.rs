use crate::config::config::MarketCfg;
use crate::core::types::Trend;
use crate::market::probability::{ProbabilityDistribution, adjust_probabilities};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, info};

const LONG_RUN_LEVEL: f64 = 100.0; // a sum of 7 normalised
const FORECAST_WINDOW: usize = 10;
const FORECAST_MIN_POINTS: usize = 3;
const SMOOTHING: f64 = 0.3;

const BULL_HEADLINES: [&str; 5] = [
    "Market optimism rises as investors flock to higher sums!",
    "Analysts predict continued growth in high-value dice rolls!",
    "Bull market continues as high sums show strong performance!",
    "Investors confident in upper-range dice outcomes!",
    "Market rally continues with strong performance in sums 7-12!",
];

const BEAR_HEADLINES: [&str; 5] = [
    "Market caution as investors favor conservative bets!",
    "Analysts recommend focusing on lower sums in current climate!",
    "Bear market persists with strong performance in lower ranges!",
    "Investors seeking safety in lower-sum dice outcomes!",
    "Market downturn continues with strength in sums 2-6!",
];

const VOLATILITY_HEADLINES: [&str; 5] = [
    "Market volatility increases! Unexpected outcomes more likely!",
    "Unpredictable market conditions as volatility spikes!",
    "Analysts warn of increased uncertainty in dice outcomes!",
    "Market turbulence creates opportunities for risk-takers!",
    "High volatility market conditions reported by financial experts!",
];

/// Picks a display headline. Volatility headlines win with probability
/// `min(1, 2 * volatility)`, otherwise one matching the trend.
pub fn headline<R: Rng + ?Sized>(trend: Trend, volatility: f64, rng: &mut R) -> &'static str {
    let p_volatile = (2.0 * volatility).clamp(0.0, 1.0);
    let pool = if rng.random_bool(p_volatile) {
        &VOLATILITY_HEADLINES
    } else {
        match trend {
            Trend::Bull => &BULL_HEADLINES,
            Trend::Bear => &BEAR_HEADLINES,
        }
    };
    pool[rng.random_range(0..pool.len())]
}

/// Bull/bear regime machine driven by dice outcomes.
///
/// Each regime lasts a uniformly drawn number of rounds. At the end of a
/// regime the next one is forecast from recent outcomes (with
/// `forecast_probability`) or drawn at random.
pub struct MarketSimulator {
    trend: Trend,
    volatility: f64,
    duration: u32,
    round: u32,
    observations: VecDeque<f64>,
    cfg: MarketCfg,
    rng: StdRng,
}

impl MarketSimulator {
    pub fn new(cfg: MarketCfg, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let trend = Trend::random(&mut rng);
        let duration = rng.random_range(cfg.min_duration..=cfg.max_duration);
        Self {
            trend,
            volatility: cfg.volatility.clamp(0.0, 1.0),
            duration,
            round: 0,
            observations: VecDeque::with_capacity(cfg.history_len),
            cfg,
            rng,
        }
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn set_volatility(&mut self, volatility: f64) {
        self.volatility = if volatility.is_nan() {
            0.0
        } else {
            volatility.clamp(0.0, 1.0)
        };
    }

    /// Rounds left before the next regime decision.
    pub fn remaining(&self) -> u32 {
        self.duration.saturating_sub(self.round)
    }

    pub fn probabilities(&self) -> ProbabilityDistribution {
        adjust_probabilities(self.trend, self.volatility)
    }

    /// Feeds one dice outcome. Returns the current trend and whether its
    /// value actually changed (a decision point that re-selects the same
    /// trend reports `false`).
    pub fn update(&mut self, dice_sum: u8) -> (Trend, bool) {
        self.observe(dice_sum);
        self.round += 1;

        if self.round < self.duration {
            return (self.trend, false);
        }

        self.round = 0;
        self.duration = self
            .rng
            .random_range(self.cfg.min_duration..=self.cfg.max_duration);

        let next = if self.rng.random_bool(self.cfg.forecast_probability) {
            self.forecast().unwrap_or_else(|| Trend::random(&mut self.rng))
        } else {
            Trend::random(&mut self.rng)
        };

        let changed = next != self.trend;
        if changed {
            info!(from = %self.trend, to = %next, duration = self.duration, "Market trend changed");
        } else {
            debug!(trend = %next, duration = self.duration, "Market trend held");
        }
        self.trend = next;
        (self.trend, changed)
    }

    pub fn news(&mut self) -> &'static str {
        headline(self.trend, self.volatility, &mut self.rng)
    }

    fn observe(&mut self, dice_sum: u8) {
        if self.observations.len() >= self.cfg.history_len {
            self.observations.pop_front();
        }
        self.observations
            .push_back(dice_sum as f64 / 7.0 * LONG_RUN_LEVEL);
    }

    /// Smoothed recent level vs. the long-run level. `None` when too few
    /// observations exist to say anything.
    fn forecast(&self) -> Option<Trend> {
        let n = self.observations.len();
        if n < FORECAST_MIN_POINTS {
            return None;
        }
        let mut recent = self.observations.iter().skip(n.saturating_sub(FORECAST_WINDOW));
        let first = *recent.next()?;
        let level = recent.fold(first, |ema, &x| SMOOTHING * x + (1.0 - SMOOTHING) * ema);

        Some(if level > LONG_RUN_LEVEL {
            Trend::Bull
        } else if level < LONG_RUN_LEVEL {
            Trend::Bear
        } else {
            self.trend
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MarketCfg {
        MarketCfg::default()
    }

    #[test]
    fn test_duration_drawn_within_bounds() {
        for seed in 0..50 {
            let sim = MarketSimulator::new(cfg(), Some(seed));
            assert!((3..=7).contains(&sim.remaining()));
        }
    }

    #[test]
    fn test_trend_only_changes_at_decision_points() {
        let mut sim = MarketSimulator::new(cfg(), Some(11));
        for _ in 0..200 {
            let before = sim.trend();
            let remaining = sim.remaining();
            let (after, changed) = sim.update(7);
            assert_eq!(changed, before != after);
            if remaining > 1 {
                assert!(!changed);
            } else {
                // decision point: a fresh duration is drawn
                assert!((3..=7).contains(&sim.remaining()));
            }
        }
    }

    #[test]
    fn test_forecast_follows_high_outcomes() {
        let mut c = cfg();
        c.forecast_probability = 1.0;
        let mut sim = MarketSimulator::new(c, Some(3));
        for _ in 0..40 {
            sim.update(12);
        }
        assert_eq!(sim.trend(), Trend::Bull);

        for _ in 0..40 {
            sim.update(2);
        }
        assert_eq!(sim.trend(), Trend::Bear);
    }

    #[test]
    fn test_forecast_needs_minimum_history() {
        let sim = MarketSimulator::new(cfg(), Some(5));
        assert_eq!(sim.forecast(), None);
    }

    #[test]
    fn test_observation_window_is_bounded() {
        let mut sim = MarketSimulator::new(cfg(), Some(9));
        for _ in 0..500 {
            sim.update(8);
        }
        assert_eq!(sim.observations.len(), cfg().history_len);
    }

    #[test]
    fn test_headline_weighting() {
        let mut rng = StdRng::seed_from_u64(1);
        // 2 * 0.5 = 1.0: always volatile
        for _ in 0..50 {
            let h = headline(Trend::Bull, 0.5, &mut rng);
            assert!(VOLATILITY_HEADLINES.contains(&h));
        }
        // no volatility: always trend headlines
        for _ in 0..50 {
            let h = headline(Trend::Bear, 0.0, &mut rng);
            assert!(BEAR_HEADLINES.contains(&h));
        }
    }

    #[test]
    fn test_probabilities_follow_state() {
        let mut sim = MarketSimulator::new(cfg(), Some(2));
        sim.set_volatility(3.0);
        assert_eq!(sim.volatility(), 1.0);
        let p = sim.probabilities();
        assert!((p.total() - 1.0).abs() < 1e-9);
    }
}
