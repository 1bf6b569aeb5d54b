use crate::anthropic::AnthropicClient;
use crate::error::{LlmError, Result};
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;
use crate::types::{ChatMessage, Generation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn detect(model: &str) -> Self {
        let m = model.trim().to_ascii_lowercase();
        if m.starts_with("claude-") {
            return Provider::Anthropic;
        }
        if m.starts_with("gemini-") || m.starts_with("models/gemini-") {
            return Provider::Gemini;
        }
        Provider::OpenAI
    }

    /// Whether the provider accepts a top-level array response schema.
    pub fn supports_response_schema(self) -> bool {
        matches!(self, Provider::Gemini)
    }
}

#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(api_key: &str, model: &str) -> Self {
        let provider = Provider::detect(model);
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        Self {
            provider,
            api_key: api_key.to_string(),
            model: model.trim().to_string(),
            base_url: None,
            client,
        }
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single-turn generation. `schema` is a best-effort hint: providers
    /// without array-schema support receive the prompt alone.
    #[tracing::instrument(level = "info", skip_all, fields(provider = ?self.provider, model = %self.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        schema: Option<&serde_json::Value>,
    ) -> Result<Generation> {
        if prompt.trim().is_empty() {
            return Err(LlmError::InvalidInput("prompt must not be empty".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(LlmError::InvalidInput("api key must not be empty".to_string()));
        }

        let messages = [ChatMessage::user(prompt)];
        let schema = schema.filter(|_| self.provider.supports_response_schema());
        let generation = match self.provider {
            Provider::OpenAI => {
                let c = OpenAiClient::new(
                    self.client.clone(),
                    &self.api_key,
                    &self.model,
                    self.base_url.as_deref(),
                );
                c.chat(&messages).await?
            }
            Provider::Anthropic => {
                let c = AnthropicClient::new(
                    self.client.clone(),
                    &self.api_key,
                    &self.model,
                    self.base_url.as_deref(),
                );
                c.chat(&messages).await?
            }
            Provider::Gemini => {
                let c = GeminiClient::new(
                    self.client.clone(),
                    &self.api_key,
                    &self.model,
                    self.base_url.as_deref(),
                );
                c.generate_content(&messages, schema).await?
            }
        };

        tracing::debug!(
            prompt_tokens = generation.usage.prompt_tokens,
            completion_tokens = generation.usage.completion_tokens,
            finish_reason = %generation.finish_reason,
            schema_applied = generation.schema_applied,
            "generation complete"
        );
        Ok(generation)
    }
}
