mod advisor;
mod analytics;
mod config;
mod core;
mod game;
mod llm;
mod market;
mod persistence;
mod portfolio;
mod rl;
mod strategy;

use advisor::orchestrator::{AdvisoryOrchestrator, OrchestratorSettings};
use advisor::provider::AdviceProvider;
use anyhow::{Context, Result};
use config::config::AppCfg;
use game::session::GameSession;
use llm::client::DeepSeekProvider;
use llm::openrouter::OpenRouterProvider;
use persistence::q_store::QTableStore;
use reqwest::Client;
use rl::q_learning::QLearner;
use tracing::{error, info, info_span, warn};

fn build_providers(cfg: &AppCfg, client: &Client) -> Vec<Box<dyn AdviceProvider>> {
    let mut providers: Vec<Box<dyn AdviceProvider>> = Vec::new();
    for name in &cfg.advisor.providers {
        match name.as_str() {
            "deepseek" => providers.push(Box::new(DeepSeekProvider::new(cfg.deepseek.clone()))),
            "openrouter" => providers.push(Box::new(OpenRouterProvider::new(
                cfg.openrouter.clone(),
                client.clone(),
            ))),
            other => warn!(provider = other, "Skipping unknown advice provider"),
        }
    }
    providers
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cfg = AppCfg::load("config.yml")?;

    let span = info_span!(
        "Session",
        pid = %std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
    );
    let _enter = span.enter();

    info!("Starting up");

    let client = Client::builder()
        .user_agent(cfg.http.user_agent.clone())
        .timeout(cfg.http.timeout)
        .build()
        .context("building http client")?;

    let providers = build_providers(&cfg, &client);
    info!(
        providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "Advice providers ready"
    );

    let store = QTableStore::new(&cfg.advisor.q_table_path);
    let mut learner = QLearner::new(cfg.advisor.alpha, cfg.advisor.gamma);
    let restored = store.load_into(&mut learner);
    info!(entries = restored, path = %store.path().display(), "Q-table restored");

    let advisor = AdvisoryOrchestrator::new(providers, learner, OrchestratorSettings::from_cfg(&cfg));
    let mut session = GameSession::new(&cfg, advisor)?;

    info!(
        bankroll = session.bankroll(),
        rounds = cfg.game.rounds,
        strategy = %session.strategy(),
        "Session started"
    );

    tokio::select! {
        _ = async {
            for _ in 0..cfg.game.rounds {
                if session.is_bankrupt() {
                    warn!("Bankroll exhausted, stopping");
                    break;
                }
                let rec = match session.recommend().await {
                    Ok(rec) => rec,
                    Err(e) => {
                        error!(error = %e, "No recommendation");
                        break;
                    }
                };
                info!(
                    sum = rec.advice.recommended_sum,
                    strategy = %rec.advice.recommended_strategy,
                    source = %rec.source,
                    stake = rec.stake,
                    reasoning = %rec.advice.reasoning,
                    "Advice"
                );
                match session.play_recommendation(&rec) {
                    Ok(res) => info!(news = %res.news, "Market news"),
                    Err(e) => {
                        error!(error = %e, "Round rejected");
                        break;
                    }
                }
                if let Err(e) = store.save(session.advisor().learner()) {
                    warn!(error = ?e, "Q-table save failed");
                }
            }
        } => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, ending session");
        }
    }

    let saved = store
        .save(session.advisor().learner())
        .context("saving Q-table")?;
    info!(entries = saved, "Q-table saved");

    let summary = session.analytics();
    info!(
        rounds = summary.rounds,
        bankroll = summary.current_bankroll,
        profit_loss = summary.profit_loss,
        win_rate = summary.win_rate,
        sharpe = summary.sharpe_ratio,
        max_drawdown = summary.max_drawdown,
        bull_return = summary.avg_return_bull,
        bear_return = summary.avg_return_bear,
        "Session summary"
    );
    for (sum, profit) in &summary.profit_by_sum {
        info!(sum, profit, "Profit by sum");
    }

    info!("Session exit");
    Ok(())
}
