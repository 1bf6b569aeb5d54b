use crate::error::{LlmError, Result};
use crate::types::{ChatMessage, Generation, Role, Usage};
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(model);
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.unwrap_or(GEMINI_API_BASE).to_string(),
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn generate_content(
        &self,
        messages: &[ChatMessage],
        schema: Option<&serde_json::Value>,
    ) -> Result<Generation> {
        let req = GeminiRequest::new(messages, schema);

        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                provider: "gemini",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        let mut generation = Generation::try_from(parsed)?;
        generation.schema_applied = schema.is_some();
        Ok(generation)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiRequest {
    fn new(messages: &[ChatMessage], schema: Option<&serde_json::Value>) -> Self {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for m in messages {
            let part = GeminiPart {
                text: m.content.clone(),
            };
            match m.role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![part],
                }),
                Role::Assistant => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        Self {
            contents,
            system_instruction,
            generation_config: schema.map(|schema| GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl TryFrom<GeminiResponse> for Generation {
    type Error = LlmError;

    fn try_from(v: GeminiResponse) -> Result<Self> {
        let Some(candidate) = v.candidates.into_iter().next() else {
            let feedback = v
                .prompt_feedback
                .map(|f| f.to_string())
                .unwrap_or_else(|| "none".to_string());
            return Err(LlmError::ResponseFormat(format!(
                "gemini response missing candidates (prompt_feedback={feedback})"
            )));
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let usage = v.usage_metadata.unwrap_or_default();

        Ok(Generation {
            text,
            usage: Usage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
            },
            finish_reason: candidate
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string()),
            schema_applied: false,
        })
    }
}
