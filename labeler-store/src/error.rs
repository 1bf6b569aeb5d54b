use thiserror::Error;

pub type Result<T> = std::result::Result<T, LabelStoreError>;

#[derive(Debug, Error)]
pub enum LabelStoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The label already exists in the store, usually because a concurrent
    /// run created it between our listing and our create call.
    #[error("label already exists: {name}")]
    Conflict { name: String },

    #[error("label store api error: status={status} message={message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
}

impl LabelStoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<reqwest::Error> for LabelStoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<serde_json::Error> for LabelStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseFormat(e.to_string())
    }
}
