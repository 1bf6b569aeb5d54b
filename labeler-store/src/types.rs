use crate::error::LabelStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A label as stored in the remote repository.
///
/// Identity is the case-folded name: `Bug` and `bug` are the same label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: String,
}

impl Label {
    pub fn key(&self) -> String {
        label_key(&self.name)
    }
}

/// Case-folded identity of a label name.
pub fn label_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Request to create a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLabel {
    pub name: String,
    pub color: String,
    pub description: String,
}

/// Repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = LabelStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((owner, name)) = s.split_once('/') else {
            return Err(LabelStoreError::InvalidInput(format!(
                "repository must be owner/name, got {s:?}"
            )));
        };
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(LabelStoreError::InvalidInput(format!(
                "repository must be owner/name, got {s:?}"
            )));
        }
        Ok(Self::new(owner, name))
    }
}
