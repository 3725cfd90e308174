use crate::core::types::{MIN_SUM, SUMS};

/// Gross payout multiplier per sum, 2..=12. Symmetric around 7.
const MULTIPLIERS: [u32; 11] = [36, 18, 12, 9, 7, 6, 7, 9, 12, 18, 36];

#[derive(Debug, Clone, Copy, Default)]
pub struct PayoutTable;

impl PayoutTable {
    pub fn new() -> Self {
        Self
    }

    /// Multiplier for `sum`, or `None` outside 2..=12.
    pub fn multiplier(&self, sum: u8) -> Option<u32> {
        SUMS.contains(&sum)
            .then(|| MULTIPLIERS[(sum - MIN_SUM) as usize])
    }

    /// Multiplier as f64; 0.0 for sums that cannot be rolled.
    pub fn payout(&self, sum: u8) -> f64 {
        self.multiplier(sum).map(f64::from).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> {
        SUMS.zip(MULTIPLIERS)
    }
}
