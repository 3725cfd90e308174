//! Reads of the tail of an outcome history. Only the suffix needed to
//! decide a streak is ever walked.

use crate::core::types::BetOutcome;

/// Type and length of the run of identical outcomes at the end.
pub fn trailing_streak(history: &[BetOutcome]) -> Option<(BetOutcome, usize)> {
    let last = *history.last()?;
    let len = history.iter().rev().take_while(|&&o| o == last).count();
    Some((last, len))
}

pub fn trailing_losses(history: &[BetOutcome]) -> usize {
    history
        .iter()
        .rev()
        .take_while(|&&o| o == BetOutcome::Loss)
        .count()
}

/// Share of wins among the last `window` outcomes; 0.0 for no history.
pub fn recent_win_rate(history: &[BetOutcome], window: usize) -> f64 {
    let tail = &history[history.len().saturating_sub(window)..];
    if tail.is_empty() {
        return 0.0;
    }
    let wins = tail.iter().filter(|&&o| o == BetOutcome::Win).count();
    wins as f64 / tail.len() as f64
}
