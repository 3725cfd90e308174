use crate::core::types::Trend;
use serde::Serialize;
use std::collections::BTreeMap;

/// One settled round as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub bankroll: f64,
    pub win: bool,
    pub stake: f64,
    /// Sum carrying the largest stake in the round.
    pub bet_sum: u8,
    pub dice_result: u8,
    /// Trend the round was played under.
    pub trend: Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub rounds: usize,
    pub starting_bankroll: f64,
    pub current_bankroll: f64,
    pub profit_loss: f64,
    pub win_rate: f64,
    pub avg_win_stake: f64,
    pub avg_loss_stake: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall as a fraction of the peak.
    pub max_drawdown: f64,
    /// (sum, stake won minus stake lost), most profitable first.
    pub profit_by_sum: Vec<(u8, f64)>,
    pub avg_return_bull: f64,
    pub avg_return_bear: f64,
}

#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    initial_bankroll: f64,
    records: Vec<RoundRecord>,
    peak_balance: f64,
    max_drawdown: f64,
}

impl PerformanceTracker {
    pub fn new(initial_bankroll: f64) -> Self {
        Self {
            initial_bankroll,
            records: Vec::new(),
            peak_balance: initial_bankroll,
            max_drawdown: 0.0,
        }
    }

    pub fn record(&mut self, record: RoundRecord) {
        if record.bankroll > self.peak_balance {
            self.peak_balance = record.bankroll;
        } else if self.peak_balance > 0.0 {
            let drawdown = (self.peak_balance - record.bankroll) / self.peak_balance;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
                metrics::gauge!("max_drawdown_pct").set(drawdown * 100.0);
            }
        }
        self.records.push(record);
    }

    /// Per-round bankroll returns, each tagged with the round's trend.
    /// Rounds starting from a non-positive bankroll have no defined return.
    fn returns(&self) -> Vec<(Trend, f64)> {
        let mut prev = self.initial_bankroll;
        let mut out = Vec::with_capacity(self.records.len());
        for r in &self.records {
            if prev > 0.0 {
                out.push((r.trend, (r.bankroll - prev) / prev));
            }
            prev = r.bankroll;
        }
        out
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let rounds = self.records.len();
        let current = self
            .records
            .last()
            .map_or(self.initial_bankroll, |r| r.bankroll);

        let (wins, losses): (Vec<&RoundRecord>, Vec<&RoundRecord>) =
            self.records.iter().partition(|r| r.win);
        let avg_stake = |rs: &[&RoundRecord]| mean(rs.iter().map(|r| r.stake));

        let returns = self.returns();
        let all: Vec<f64> = returns.iter().map(|&(_, r)| r).collect();
        let sharpe_ratio = if all.is_empty() {
            0.0
        } else {
            let m = mean(all.iter().copied());
            let var = mean(all.iter().map(|r| (r - m).powi(2)));
            let std = if var > 0.0 { var.sqrt() } else { 1.0 };
            m / std
        };

        let mut by_sum: BTreeMap<u8, f64> = BTreeMap::new();
        for r in &self.records {
            *by_sum.entry(r.bet_sum).or_default() += if r.win { r.stake } else { -r.stake };
        }
        let mut profit_by_sum: Vec<(u8, f64)> = by_sum.into_iter().collect();
        profit_by_sum.sort_by(|a, b| b.1.total_cmp(&a.1));

        let trend_mean = |t: Trend| {
            mean(returns.iter().filter(|(tr, _)| *tr == t).map(|&(_, r)| r))
        };

        AnalyticsSummary {
            rounds,
            starting_bankroll: self.initial_bankroll,
            current_bankroll: current,
            profit_loss: current - self.initial_bankroll,
            win_rate: if rounds == 0 {
                0.0
            } else {
                wins.len() as f64 / rounds as f64
            },
            avg_win_stake: avg_stake(&wins[..]),
            avg_loss_stake: avg_stake(&losses[..]),
            sharpe_ratio,
            max_drawdown: self.max_drawdown,
            profit_by_sum,
            avg_return_bull: trend_mean(Trend::Bull),
            avg_return_bear: trend_mean(Trend::Bear),
        }
    }
}

/// 0.0 for an empty iterator.
fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
