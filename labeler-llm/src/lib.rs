//! BYO-key text-generation client for the issue labeler.
//!
//! Pure HTTP client. The provider is picked from the model name; structured
//! output is requested where the provider supports it and silently skipped
//! where it does not.

mod anthropic;
mod client;
mod error;
mod gemini;
mod openai;
mod types;

pub use client::{LlmClient, Provider};
pub use error::{LlmError, Result};
pub use types::{ChatMessage, Generation, Role, Usage};
