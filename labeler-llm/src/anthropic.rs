use crate::error::{LlmError, Result};
use crate::types::{ChatMessage, Generation, Role, Usage};
use serde::{Deserialize, Serialize};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 2048;

#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.unwrap_or(ANTHROPIC_API_BASE).to_string(),
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<Generation> {
        let req = AnthropicRequest::new(&self.model, messages);

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                provider: "anthropic",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)?;
        Ok(parsed.into())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

impl AnthropicRequest {
    fn new(model: &str, messages: &[ChatMessage]) -> Self {
        let mut system_parts = Vec::new();
        let mut out_messages = Vec::new();
        for m in messages {
            match m.role {
                Role::System => system_parts.push(m.content.clone()),
                Role::User | Role::Assistant => out_messages.push(AnthropicMessage {
                    role: m.role.as_str().to_string(),
                    content: vec![AnthropicContentBlock::Text {
                        text: m.content.clone(),
                    }],
                }),
            }
        }

        Self {
            model: model.to_string(),
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system: Some(system_parts.join("\n\n")).filter(|s| !s.is_empty()),
            messages: out_messages,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: String,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl From<AnthropicResponse> for Generation {
    fn from(v: AnthropicResponse) -> Self {
        let mut text = String::new();
        for block in v.content {
            if let AnthropicContentBlock::Text { text: t } = block {
                text.push_str(&t);
            }
        }

        Generation {
            text,
            usage: Usage {
                prompt_tokens: v.usage.input_tokens as u32,
                completion_tokens: v.usage.output_tokens as u32,
            },
            finish_reason: v.stop_reason,
            schema_applied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_messages_are_lifted_out_of_the_message_list() {
        let req = AnthropicRequest::new(
            "claude-3-5-haiku-latest",
            &[
                ChatMessage {
                    role: Role::System,
                    content: "You label issues.".to_string(),
                },
                ChatMessage::user("label this"),
            ],
        );
        let v = serde_json::to_value(&req).expect("serialize request");
        assert_eq!(v["system"], "You label issues.");
        assert_eq!(v["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(v["messages"][0]["role"], "user");
        assert_eq!(v["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn text_blocks_are_concatenated_and_unknown_blocks_ignored() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "[{\"name\":" },
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "\"bug\"}]" }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 30, "output_tokens": 9 }
        }))
        .expect("deserialize response");
        let generation = Generation::from(parsed);
        assert_eq!(generation.text, "[{\"name\":\"bug\"}]");
        assert_eq!(generation.usage.completion_tokens, 9);
        assert_eq!(generation.finish_reason, "end_turn");
    }
}
