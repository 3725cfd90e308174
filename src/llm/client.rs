use crate::advisor::provider::{AdviceError, AdviceProvider, AdviceRequest};
use crate::config::config::LlmCfg;
use crate::core::types::AdviceResult;
use crate::llm::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::llm::{Limiter, advice_from_content, limiter};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::info;

/// DeepSeek's OpenAI-compatible API through the typed async-openai client.
#[derive(Clone)]
pub struct DeepSeekProvider {
    client: Client<OpenAIConfig>,
    cfg: LlmCfg,
    limiter: Limiter,
}

impl DeepSeekProvider {
    pub fn new(cfg: LlmCfg) -> Self {
        let limiter = limiter(cfg.rate_limit_rpm);

        let openai_config = OpenAIConfig::new()
            .with_api_key(&cfg.api_key)
            .with_api_base(&cfg.base_url);
        let client = Client::with_config(openai_config);

        Self {
            client,
            cfg,
            limiter,
        }
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(&self, prompt: String) -> Result<Option<String>> {
        self.limiter.until_ready().await;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.cfg.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .temperature(self.cfg.temperature)
            .max_completion_tokens(self.cfg.max_tokens)
            .build()?;

        info!(
            "Calling LLM at {} with model {}",
            self.cfg.base_url, self.cfg.model
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .context("LLM request failed")?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[async_trait]
impl AdviceProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResult, AdviceError> {
        if !self.cfg.has_credentials() {
            return Err(AdviceError::MissingCredentials);
        }
        let content = self
            .complete(build_prompt(request))
            .await
            .map_err(|e| AdviceError::Transport(format!("{e:#}")))?;
        advice_from_content(self.name(), content.as_deref(), request)
    }
}
