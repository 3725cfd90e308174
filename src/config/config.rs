use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

use crate::strategy::types::{StakeParams, StrategyId};

pub const KNOWN_PROVIDERS: [&str; 2] = ["deepseek", "openrouter"];

#[derive(Debug, Deserialize, Clone)]
pub struct AppCfg {
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub game: GameCfg,
    #[serde(default)]
    pub market: MarketCfg,
    #[serde(default)]
    pub advisor: AdvisorCfg,
    #[serde(default = "LlmCfg::deepseek")]
    pub deepseek: LlmCfg,
    #[serde(default = "LlmCfg::openrouter")]
    pub openrouter: LlmCfg,
    #[serde(default)]
    pub stakes: StakeParams,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            http: HttpCfg::default(),
            game: GameCfg::default(),
            market: MarketCfg::default(),
            advisor: AdvisorCfg::default(),
            deepseek: LlmCfg::deepseek(),
            openrouter: LlmCfg::openrouter(),
            stakes: StakeParams::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpCfg {
    #[serde(rename = "userAgent", default = "default_ua")]
    pub user_agent: String,
    /// Upper bound on a single advice call.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: default_ua(),
            timeout: default_timeout(),
        }
    }
}
fn default_ua() -> String {
    "dicetrader/0.1".into()
}
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameCfg {
    #[serde(rename = "initialBankroll", default = "default_bankroll")]
    pub initial_bankroll: f64,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(rename = "maxStakeFraction", default = "default_max_stake_fraction")]
    pub max_stake_fraction: f64,
}

impl Default for GameCfg {
    fn default() -> Self {
        Self {
            initial_bankroll: default_bankroll(),
            rounds: default_rounds(),
            strategy: default_strategy(),
            seed: None,
            max_stake_fraction: default_max_stake_fraction(),
        }
    }
}
fn default_bankroll() -> f64 {
    100.0
}
fn default_rounds() -> u32 {
    50
}
fn default_strategy() -> String {
    StrategyId::Percentage.as_str().to_string()
}
fn default_max_stake_fraction() -> f64 {
    0.25
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketCfg {
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(rename = "forecastProbability", default = "default_forecast_probability")]
    pub forecast_probability: f64,
    #[serde(rename = "minDuration", default = "default_min_duration")]
    pub min_duration: u32,
    #[serde(rename = "maxDuration", default = "default_max_duration")]
    pub max_duration: u32,
    #[serde(rename = "historyLen", default = "default_history_len")]
    pub history_len: usize,
}

impl Default for MarketCfg {
    fn default() -> Self {
        Self {
            volatility: default_volatility(),
            forecast_probability: default_forecast_probability(),
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
            history_len: default_history_len(),
        }
    }
}
fn default_volatility() -> f64 {
    0.2
}
fn default_forecast_probability() -> f64 {
    0.7
}
fn default_min_duration() -> u32 {
    3
}
fn default_max_duration() -> u32 {
    7
}
fn default_history_len() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorCfg {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(rename = "qTablePath", default = "default_q_table_path")]
    pub q_table_path: String,
    /// Priority order of external providers.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
}

impl Default for AdvisorCfg {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            gamma: default_gamma(),
            epsilon: default_epsilon(),
            q_table_path: default_q_table_path(),
            providers: default_providers(),
        }
    }
}
fn default_alpha() -> f64 {
    0.1
}
fn default_gamma() -> f64 {
    0.95
}
fn default_epsilon() -> f64 {
    0.2
}
fn default_q_table_path() -> String {
    "data/q_values.json".into()
}
fn default_providers() -> Vec<String> {
    KNOWN_PROVIDERS.iter().map(|p| p.to_string()).collect()
}

/// One OpenAI-compatible chat endpoint. An empty `apiKey` means the
/// provider has no credentials and is skipped at call time.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmCfg {
    #[serde(rename = "baseUrl", default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "apiKey", alias = "api_key", alias = "apikey", default)]
    pub api_key: String,
    #[serde(rename = "rateLimitRpm", default = "default_rpm")]
    pub rate_limit_rpm: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmCfg {
    pub fn deepseek() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".into(),
            model: "deepseek-chat".into(),
            api_key: String::new(),
            rate_limit_rpm: default_rpm(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn openrouter() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            model: "deepseek/deepseek-chat".into(),
            api_key: String::new(),
            rate_limit_rpm: default_rpm(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Endpoint and model left blank take the provider's defaults, so a
    /// section holding only an api key is enough.
    fn fill_missing(&mut self, defaults: LlmCfg) {
        if self.base_url.trim().is_empty() {
            self.base_url = defaults.base_url;
        }
        if self.model.trim().is_empty() {
            self.model = defaults.model;
        }
    }
}
fn default_rpm() -> u32 {
    20
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    500
}

impl AppCfg {
    /// Loads `path` (missing file is fine) and overlays `SECTION__KEY`
    /// environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .context("building config")?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: Config) -> Result<Self> {
        let mut app: AppCfg = cfg.try_deserialize().context("deserializing config")?;
        app.deepseek.fill_missing(LlmCfg::deepseek());
        app.openrouter.fill_missing(LlmCfg::openrouter());
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.game.initial_bankroll > 0.0,
            "game.initialBankroll must be > 0"
        );
        anyhow::ensure!(
            self.game.max_stake_fraction > 0.0 && self.game.max_stake_fraction <= 1.0,
            "game.maxStakeFraction must be in (0, 1]"
        );
        self.game
            .strategy
            .parse::<StrategyId>()
            .context("game.strategy")?;

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.market.volatility),
            "market.volatility must be in [0, 1]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.market.forecast_probability),
            "market.forecastProbability must be in [0, 1]"
        );
        anyhow::ensure!(
            self.market.min_duration > 0 && self.market.min_duration <= self.market.max_duration,
            "market.minDuration must be > 0 and <= market.maxDuration"
        );
        anyhow::ensure!(self.market.history_len > 0, "market.historyLen must be > 0");

        anyhow::ensure!(
            self.advisor.alpha > 0.0 && self.advisor.alpha <= 1.0,
            "advisor.alpha must be in (0, 1]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.advisor.gamma),
            "advisor.gamma must be in [0, 1]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.advisor.epsilon),
            "advisor.epsilon must be in [0, 1]"
        );
        for name in &self.advisor.providers {
            anyhow::ensure!(
                KNOWN_PROVIDERS.contains(&name.as_str()),
                "advisor.providers: unknown provider '{name}'"
            );
        }

        for (section, llm) in [("deepseek", &self.deepseek), ("openrouter", &self.openrouter)] {
            anyhow::ensure!(!llm.base_url.is_empty(), "{section}.baseUrl missing");
            anyhow::ensure!(!llm.model.is_empty(), "{section}.model missing");
            anyhow::ensure!(llm.rate_limit_rpm > 0, "{section}.rateLimitRpm must be > 0");
        }

        let stakes = &self.stakes;
        anyhow::ensure!(stakes.fixed_amount > 0.0, "stakes.fixedAmount must be > 0");
        for (name, fraction) in [
            ("percentage", stakes.percentage),
            ("masaniello", stakes.masaniello),
            ("kellyFraction", stakes.kelly_fraction),
        ] {
            anyhow::ensure!(
                fraction > 0.0 && fraction <= 1.0,
                "stakes.{name} must be in (0, 1]"
            );
        }
        anyhow::ensure!(stakes.martingale_base > 0.0, "stakes.martingaleBase must be > 0");
        anyhow::ensure!(stakes.dalembert_unit > 0.0, "stakes.dalembertUnit must be > 0");
        Ok(())
    }
}
