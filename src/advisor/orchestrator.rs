use crate::advisor::heuristic::local_strategy;
use crate::advisor::provider::{AdviceError, AdviceProvider, AdviceRequest};
use crate::config::config::AppCfg;
use crate::core::types::{AdviceResult, BetOutcome};
use crate::market::payout::PayoutTable;
use crate::rl::q_learning::QLearner;
use crate::rl::state::{StateKey, encode_state};
use crate::strategy::staking::compute_stake;
use crate::strategy::types::{Odds, StakeParams};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

const FALLBACK_STAKE_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AdviceSource {
    Provider(String),
    LocalRl,
}

impl fmt::Display for AdviceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceSource::Provider(name) => f.write_str(name),
            AdviceSource::LocalRl => f.write_str("local_rl"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub advice: AdviceResult,
    pub source: AdviceSource,
    /// Stake for `advice.recommended_sum` under the recommended strategy.
    pub stake: f64,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub epsilon: f64,
    pub timeout: Duration,
    pub max_stake_fraction: f64,
    pub stakes: StakeParams,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            timeout: Duration::from_secs(10),
            max_stake_fraction: 0.25,
            stakes: StakeParams::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self {
            epsilon: cfg.advisor.epsilon,
            timeout: cfg.http.timeout,
            max_stake_fraction: cfg.game.max_stake_fraction,
            stakes: cfg.stakes.clone(),
        }
    }
}

/// Tiered advice: the provider that last answered, then the remaining
/// providers in priority order, then the local Q-learner.
pub struct AdvisoryOrchestrator {
    providers: Vec<Box<dyn AdviceProvider>>,
    sticky: Option<usize>,
    learner: QLearner,
    payouts: PayoutTable,
    settings: OrchestratorSettings,
}

impl AdvisoryOrchestrator {
    pub fn new(
        providers: Vec<Box<dyn AdviceProvider>>,
        learner: QLearner,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            providers,
            sticky: None,
            learner,
            payouts: PayoutTable::new(),
            settings,
        }
    }

    pub fn sticky(&self) -> Option<&str> {
        self.sticky.map(|i| self.providers[i].name())
    }

    pub fn learner(&self) -> &QLearner {
        &self.learner
    }

    /// Advice plus a stake for it. `history` is the full outcome history;
    /// providers only ever see the tail carried in `request`.
    pub async fn recommend<R: Rng + ?Sized>(
        &mut self,
        request: &AdviceRequest,
        history: &[BetOutcome],
        rng: &mut R,
    ) -> Recommendation {
        let (advice, source) = self.advise(request, rng).await;
        let stake = self.stake_for(&advice, request, history);
        debug!(sum = advice.recommended_sum, strategy = %advice.recommended_strategy, %source, stake, "Recommendation ready");
        Recommendation {
            advice,
            source,
            stake,
        }
    }

    /// First success wins; no provider is asked twice in one call.
    pub async fn advise<R: Rng + ?Sized>(
        &mut self,
        request: &AdviceRequest,
        rng: &mut R,
    ) -> (AdviceResult, AdviceSource) {
        let order: Vec<usize> = self
            .sticky
            .into_iter()
            .chain((0..self.providers.len()).filter(|&i| Some(i) != self.sticky))
            .collect();

        for idx in order {
            match self.try_provider(idx, request).await {
                Ok(advice) => {
                    let name = self.providers[idx].name().to_string();
                    if self.sticky != Some(idx) {
                        info!(provider = %name, "Preferring provider for next rounds");
                        self.sticky = Some(idx);
                    }
                    return (advice, AdviceSource::Provider(name));
                }
                Err(e) => {
                    warn!(provider = self.providers[idx].name(), error = %e, "Advice provider failed");
                }
            }
        }

        if !self.providers.is_empty() {
            warn!("All advice providers failed, using local Q-learner");
        }
        (self.local_advice(request, rng), AdviceSource::LocalRl)
    }

    async fn try_provider(
        &self,
        idx: usize,
        request: &AdviceRequest,
    ) -> Result<AdviceResult, AdviceError> {
        let provider = &self.providers[idx];
        let res = match tokio::time::timeout(self.settings.timeout, provider.advise(request)).await
        {
            Ok(res) => res,
            Err(_) => Err(AdviceError::Timeout),
        };
        let status = match &res {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("advice_requests_total", "provider" => provider.name().to_string(), "status" => status)
            .increment(1);
        res
    }

    fn local_advice<R: Rng + ?Sized>(&self, request: &AdviceRequest, rng: &mut R) -> AdviceResult {
        let state = encode_state(request.bankroll, &request.recent_outcomes, request.trend);
        let sum = self.learner.choose(&state, self.settings.epsilon, rng);
        let strategy = local_strategy(request.bankroll, request.trend);
        metrics::counter!("advice_requests_total", "provider" => "local_rl", "status" => "success")
            .increment(1);
        AdviceResult {
            recommended_sum: sum,
            recommended_strategy: strategy,
            reasoning: format!(
                "Local Q-learning choice for state {state}; {strategy} suits a {} bankroll in a {} market.",
                state.bracket.as_str(),
                request.trend
            ),
        }
    }

    /// Always supplies odds so kelly never lacks context. The stake is
    /// capped at `max_stake_fraction` of the bankroll and replaced by a
    /// small positive default if the rule produced nothing usable.
    pub fn stake_for(
        &self,
        advice: &AdviceResult,
        request: &AdviceRequest,
        history: &[BetOutcome],
    ) -> f64 {
        let bankroll = request.bankroll;
        let odds = Odds {
            probability: request.probabilities.get(advice.recommended_sum),
            payout: self.payouts.payout(advice.recommended_sum),
        };
        let stake = match compute_stake(
            advice.recommended_strategy,
            bankroll,
            history,
            Some(odds),
            &self.settings.stakes,
        ) {
            Ok(s) => s.min(bankroll * self.settings.max_stake_fraction),
            Err(e) => {
                warn!(error = %e, "Stake computation failed");
                0.0
            }
        };
        if stake > 0.0 {
            stake
        } else {
            (bankroll * FALLBACK_STAKE_FRACTION).max(1.0).min(bankroll)
        }
    }

    pub fn learn(&mut self, state: &StateKey, action: u8, reward: f64, next_state: &StateKey) {
        self.learner.update(state, action, reward, next_state);
    }
}
