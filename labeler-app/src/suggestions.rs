//! Turning raw model output into label suggestions.
//!
//! The structured path expects a JSON array of `{name, description?}`
//! objects, optionally wrapped in a markdown code fence. When that fails the
//! raw text is scanned for `"name": "..."` pairs as a last resort.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// An unvalidated label proposal from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub description: Option<String>,
}

impl Suggestion {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(Vec<Suggestion>),
    Unparsable { reason: String },
}

/// Structured parse, then name salvage.
pub fn parse_suggestions(raw: &str) -> ParseOutcome {
    match parse_structured(raw) {
        Ok(suggestions) => ParseOutcome::Parsed(suggestions),
        Err(e) => {
            tracing::warn!(error = %e, "structured parse failed; salvaging label names");
            let salvaged = salvage_names(raw);
            if salvaged.is_empty() {
                ParseOutcome::Unparsable {
                    reason: e.to_string(),
                }
            } else {
                tracing::info!(count = salvaged.len(), "salvaged label names from raw response");
                ParseOutcome::Parsed(salvaged)
            }
        }
    }
}

pub fn parse_structured(raw: &str) -> Result<Vec<Suggestion>, SuggestionError> {
    let trimmed = raw.trim();
    // Bare JSON may itself contain a fence inside a string value.
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(strip_code_fence(trimmed))
            .map_err(|e| SuggestionError::InvalidJson(e.to_string()))?,
    };
    let Value::Array(items) = value else {
        return Err(SuggestionError::MalformedResponse(format!(
            "expected a JSON array at the top level, got {}",
            json_kind(&value)
        )));
    };

    Ok(items.iter().filter_map(suggestion_from_value).collect())
}

fn suggestion_from_value(item: &Value) -> Option<Suggestion> {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let Some(name) = name else {
        tracing::debug!(item = %item, "skipping suggestion without a usable name");
        return None;
    };
    let description = item
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty());
    Some(Suggestion::new(name, description))
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````),
/// tolerating prose around it. The body runs to the last fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after = &trimmed[start + 3..];
    let info_len = after.len()
        - after
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            .len();
    let body = &after[info_len..];
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Best-effort extraction of `"name": "..."` values from arbitrary text.
pub fn salvage_names(raw: &str) -> Vec<Suggestion> {
    let pattern = match Regex::new(r#""name"\s*:\s*"((?:[^"\\]|\\.)*)""#) {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::error!(%e, "name salvage pattern failed to compile");
            return Vec::new();
        }
    };

    pattern
        .captures_iter(raw)
        .filter_map(|capture| capture.get(1))
        .map(|m| decode_json_string(m.as_str()))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .map(|name| Suggestion::new(name, None))
        .collect()
}

fn decode_json_string(escaped: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{escaped}\"")).unwrap_or_else(|_| escaped.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
