use crate::core::types::{BetOutcome, Trend};
use crate::strategy::streak::trailing_streak;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const STREAK_CAP: usize = 3;
pub const WIN_RATE_WINDOW: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BankrollBracket {
    Low,
    Medium,
    High,
}

impl BankrollBracket {
    pub fn of(bankroll: f64) -> Self {
        if bankroll < 50.0 {
            BankrollBracket::Low
        } else if bankroll < 150.0 {
            BankrollBracket::Medium
        } else {
            BankrollBracket::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BankrollBracket::Low => "low",
            BankrollBracket::Medium => "medium",
            BankrollBracket::High => "high",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(BankrollBracket::Low),
            "medium" => Some(BankrollBracket::Medium),
            "high" => Some(BankrollBracket::High),
            _ => None,
        }
    }
}

/// Discretised view of a session used as the Q-table state.
///
/// Formats as `<bracket>_<trend>_<streak>_<len>_<decile>`, e.g.
/// `medium_bull_loss_2_3`; with no history the streak reads `none_0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub bracket: BankrollBracket,
    pub trend: Trend,
    /// Last outcome and its run length, capped at [`STREAK_CAP`].
    pub streak: Option<(BetOutcome, u8)>,
    /// floor(10 * win rate over the last [`WIN_RATE_WINDOW`] results).
    pub win_decile: u8,
}

pub fn encode_state(bankroll: f64, history: &[BetOutcome], trend: Trend) -> StateKey {
    let streak = trailing_streak(history).map(|(o, n)| (o, n.min(STREAK_CAP) as u8));
    // integer division keeps floor(10 * wins / n) exact
    let tail = &history[history.len().saturating_sub(WIN_RATE_WINDOW)..];
    let wins = tail.iter().filter(|&&o| o == BetOutcome::Win).count();
    let win_decile = if tail.is_empty() {
        0
    } else {
        (wins * 10 / tail.len()) as u8
    };
    StateKey {
        bracket: BankrollBracket::of(bankroll),
        trend,
        streak,
        win_decile,
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, len) = match self.streak {
            Some((o, n)) => (o.as_str(), n),
            None => ("none", 0),
        };
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.bracket.as_str(),
            self.trend,
            kind,
            len,
            self.win_decile
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed state key '{0}'")]
pub struct KeyParseError(pub String);

impl FromStr for StateKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || KeyParseError(s.to_string());
        let parts: Vec<&str> = s.split('_').collect();
        let [bracket, trend, kind, len, decile] = parts.as_slice() else {
            return Err(bad());
        };

        let bracket = BankrollBracket::parse(bracket).ok_or_else(bad)?;
        let trend = Trend::parse(trend).ok_or_else(bad)?;
        let len: u8 = len.parse().map_err(|_| bad())?;
        let win_decile: u8 = decile.parse().map_err(|_| bad())?;
        if win_decile > 10 {
            return Err(bad());
        }

        let streak = match (*kind, len) {
            ("none", 0) => None,
            ("none", _) => return Err(bad()),
            (k, n) if (1..=STREAK_CAP as u8).contains(&n) => {
                Some((BetOutcome::parse(k).ok_or_else(bad)?, n))
            }
            _ => return Err(bad()),
        };

        Ok(StateKey {
            bracket,
            trend,
            streak,
            win_decile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BetOutcome::{Loss, Win};

    #[test]
    fn test_brackets() {
        assert_eq!(BankrollBracket::of(0.0), BankrollBracket::Low);
        assert_eq!(BankrollBracket::of(49.99), BankrollBracket::Low);
        assert_eq!(BankrollBracket::of(50.0), BankrollBracket::Medium);
        assert_eq!(BankrollBracket::of(149.0), BankrollBracket::Medium);
        assert_eq!(BankrollBracket::of(150.0), BankrollBracket::High);
    }

    #[test]
    fn test_encode_examples() {
        let history = [Loss, Loss, Loss, Win, Loss, Win, Loss, Win, Loss, Loss];
        let s = encode_state(100.0, &history, Trend::Bull);
        assert_eq!(s.to_string(), "medium_bull_loss_2_3");

        let empty = encode_state(10.0, &[], Trend::Bear);
        assert_eq!(empty.to_string(), "low_bear_none_0_0");
    }

    #[test]
    fn test_streak_is_capped_and_window_bounded() {
        let mut history = vec![Loss; 20];
        history.extend([Win; 7]);
        let s = encode_state(500.0, &history, Trend::Bull);
        assert_eq!(s.streak, Some((Win, 3)));
        // last ten: 3 losses, 7 wins
        assert_eq!(s.win_decile, 7);
        assert_eq!(s.to_string(), "high_bull_win_3_7");

        let all_wins = encode_state(60.0, &[Win; 12], Trend::Bear);
        assert_eq!(all_wins.win_decile, 10);
    }

    #[test]
    fn test_parse_roundtrip() {
        for key in ["medium_bull_loss_2_3", "low_bear_none_0_0", "high_bull_win_3_10"] {
            let parsed: StateKey = key.parse().unwrap();
            assert_eq!(parsed.to_string(), key);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for key in [
            "",
            "medium_bull_loss_2",
            "huge_bull_loss_2_3",
            "medium_sideways_loss_2_3",
            "medium_bull_draw_2_3",
            "medium_bull_loss_4_3",
            "medium_bull_none_1_3",
            "medium_bull_win_0_3",
            "medium_bull_loss_2_11",
            "__import__('os')",
        ] {
            assert!(key.parse::<StateKey>().is_err(), "{key}");
        }
    }
}
