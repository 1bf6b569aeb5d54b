//! Labeler configuration loader.
//!
//! Precedence: built-in defaults, then the optional TOML file, then
//! environment variables.

use labeler_llm::Provider;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAX_EXISTING_LABELS: usize = 5;
pub const DEFAULT_MAX_NEW_LABELS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelerConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,
    /// Ask the model service for schema-constrained output where supported.
    #[serde(default = "default_structured_output")]
    pub structured_output: bool,
    /// Override the provider API root (proxies, gateways).
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_structured_output() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            structured_output: default_structured_output(),
            api_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysConfig {
    pub github_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_max_existing")]
    pub max_existing: usize,
    #[serde(default = "default_max_new")]
    pub max_new: usize,
    /// Fixed color for created labels; random when unset.
    #[serde(default)]
    pub color: Option<String>,
}

fn default_max_existing() -> usize {
    DEFAULT_MAX_EXISTING_LABELS
}

fn default_max_new() -> usize {
    DEFAULT_MAX_NEW_LABELS
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            max_existing: default_max_existing(),
            max_new: default_max_new(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub api_url: Option<String>,
}

impl LabelerConfig {
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
                Self::from_toml_str(&contents)
                    .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?
            }
            None => Self::default(),
        };

        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("LABELER_MODEL") {
            self.model.name = v.trim().to_string();
        }
        if let Some(v) = var("LABELER_MODEL_API_URL") {
            self.model.api_url = Some(v);
        }
        if let Some(v) = var("GITHUB_TOKEN") {
            self.keys.github_token = Some(v);
        }
        if let Some(v) = var("GEMINI_API_KEY") {
            self.keys.gemini_api_key = Some(v);
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.keys.openai_api_key = Some(v);
        }
        if let Some(v) = var("ANTHROPIC_API_KEY") {
            self.keys.anthropic_api_key = Some(v);
        }
        if let Some(v) = var("MAX_EXISTING_LABELS") {
            self.labels.max_existing = parse_count("MAX_EXISTING_LABELS", &v)?;
        }
        if let Some(v) = var("MAX_NEW_LABELS") {
            self.labels.max_new = parse_count("MAX_NEW_LABELS", &v)?;
        }
        if let Some(v) = var("LABELER_LABEL_COLOR") {
            self.labels.color = Some(v);
        }
        if let Some(v) = var("GITHUB_API_URL") {
            self.github.api_url = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.name.trim().is_empty() {
            return Err(anyhow::anyhow!("model.name is required"));
        }
        if self.labels.max_existing == 0 {
            return Err(anyhow::anyhow!("labels.max_existing must be > 0"));
        }
        if let Some(color) = self.labels.color.as_deref() {
            let hex = color.trim().trim_start_matches('#');
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(anyhow::anyhow!(
                    "labels.color must be 6 hex digits, got {color:?}"
                ));
            }
        }
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        Provider::detect(&self.model.name)
    }

    pub fn github_token(&self) -> anyhow::Result<String> {
        non_empty(self.keys.github_token.as_deref()).ok_or_else(|| {
            anyhow::anyhow!("github token is required (set GITHUB_TOKEN or keys.github_token)")
        })
    }

    pub fn model_api_key(&self) -> anyhow::Result<String> {
        let (key, env) = match self.provider() {
            Provider::Gemini => (self.keys.gemini_api_key.as_deref(), "GEMINI_API_KEY"),
            Provider::OpenAI => (self.keys.openai_api_key.as_deref(), "OPENAI_API_KEY"),
            Provider::Anthropic => (self.keys.anthropic_api_key.as_deref(), "ANTHROPIC_API_KEY"),
        };
        non_empty(key).ok_or_else(|| {
            anyhow::anyhow!(
                "api key for model {:?} is required (set {env})",
                self.model.name
            )
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_count(key: &str, value: &str) -> anyhow::Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("{key} must be a non-negative integer, got {value:?}: {e}"))
}
