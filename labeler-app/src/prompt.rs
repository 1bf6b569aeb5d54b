//! Model instructions for label suggestion.

use crate::config::{DEFAULT_MAX_EXISTING_LABELS, DEFAULT_MAX_NEW_LABELS};
use crate::event::IssueContext;
use crate::inventory::LabelInventory;
use serde_json::json;

pub const EMPTY_BODY_PLACEHOLDER: &str = "No description provided.";
pub const NO_LABELS_NOTICE: &str = "There are no existing labels in this repository.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_existing: usize,
    pub max_new: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_existing: DEFAULT_MAX_EXISTING_LABELS,
            max_new: DEFAULT_MAX_NEW_LABELS,
        }
    }
}

pub fn build_prompt(issue: &IssueContext, inventory: &LabelInventory, limits: PromptLimits) -> String {
    let body = issue
        .body
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(EMPTY_BODY_PLACEHOLDER);
    let title = issue.title.trim();

    let mut out = String::new();
    out.push_str(
        "You are triaging a GitHub issue. Suggest labels that classify it, \
         following the repository's existing labeling taxonomy.\n\n",
    );

    out.push_str("## Issue\n");
    out.push_str(&format!("Title: {title}\n"));
    out.push_str("Body:\n");
    out.push_str(body);
    out.push_str("\n\n");

    out.push_str("## Existing labels\n");
    if inventory.is_empty() {
        out.push_str(NO_LABELS_NOTICE);
        out.push('\n');
    } else {
        out.push_str(&render_catalogue(inventory));
        out.push('\n');
    }
    out.push('\n');

    let mut rules = vec![format!(
        "Strongly prefer existing labels. Suggest at most {} existing label(s), \
         copying their names exactly.",
        limits.max_existing
    )];
    if limits.max_new == 0 {
        rules.push("Do not suggest new labels.".to_string());
    } else {
        rules.push(format!(
            "Suggest a new label only as a last resort, when no existing label fits. \
             Suggest at most {} new label(s).",
            limits.max_new
        ));
        rules.push(
            "New labels must follow the naming convention of the existing labels \
             (casing, separators, prefixes such as `type:` or `area/`)."
                .to_string(),
        );
    }
    rules.push("Only suggest labels that clearly apply. An empty list is acceptable.".to_string());

    out.push_str("## Rules\n");
    for (idx, rule) in rules.iter().enumerate() {
        out.push_str(&format!("{}. {rule}\n", idx + 1));
    }
    out.push('\n');

    out.push_str("## Output format\n");
    out.push_str(
        "Respond with a JSON array and nothing else. Each element is an object with:\n\
         - \"name\" (string, required): the label name.\n\
         - \"description\" (string): a one-line description, required only for new labels.\n\
         Example: [{\"name\": \"bug\"}, {\"name\": \"performance\", \"description\": \"Slow or resource-heavy behavior\"}]\n",
    );
    out
}

fn render_catalogue(inventory: &LabelInventory) -> String {
    let entries: Vec<serde_json::Value> = inventory
        .labels()
        .iter()
        .map(|label| {
            json!({
                "name": label.name,
                "description": label.description.as_deref().unwrap_or(""),
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| {
        inventory
            .labels()
            .iter()
            .map(|l| format!("- {}", l.name))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Response schema offered to services that support structured output.
pub fn suggestion_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": {
                    "type": "STRING",
                    "description": "Label name; existing labels must match exactly."
                },
                "description": {
                    "type": "STRING",
                    "description": "One-line description, required only for new labels."
                }
            },
            "required": ["name"]
        }
    })
}
