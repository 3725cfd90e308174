use crate::advisor::provider::{AdviceError, AdviceProvider, AdviceRequest};
use crate::config::config::LlmCfg;
use crate::core::types::AdviceResult;
use crate::llm::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::llm::{Limiter, advice_from_content, limiter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

/// OpenAI-compatible chat endpoint reached with plain JSON over reqwest.
#[derive(Clone)]
pub struct OpenRouterProvider {
    client: Client,
    cfg: LlmCfg,
    limiter: Limiter,
}

impl OpenRouterProvider {
    pub fn new(cfg: LlmCfg, client: Client) -> Self {
        let limiter = limiter(cfg.rate_limit_rpm);
        Self {
            client,
            cfg,
            limiter,
        }
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        self.limiter.until_ready().await;

        let req_body = json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": self.cfg.temperature,
            "max_tokens": self.cfg.max_tokens
        });

        let url = format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'));
        info!("Calling LLM at {} with model {}", url, self.cfg.model);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.cfg.api_key)
            .json(&req_body)
            .send()
            .await
            .context("LLM request failed")?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, err_text);
        }

        let resp_json: serde_json::Value =
            res.json().await.context("LLM response is not JSON")?;

        Ok(resp_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string))
    }
}

#[async_trait]
impl AdviceProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResult, AdviceError> {
        if !self.cfg.has_credentials() {
            return Err(AdviceError::MissingCredentials);
        }
        let prompt = build_prompt(request);
        let content = self
            .complete(&prompt)
            .await
            .map_err(|e| AdviceError::Transport(format!("{e:#}")))?;
        advice_from_content(self.name(), content.as_deref(), request)
    }
}
