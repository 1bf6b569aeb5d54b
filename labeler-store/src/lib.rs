//! Label store primitives for the issue labeler.
//!
//! The labeler only needs three operations from a store (list, create,
//! attach). `GitHubLabelStore` implements them over the GitHub REST API;
//! `DryRunStore` wraps any store and turns the mutating calls into logs.

mod dry_run;
mod error;
mod github;
mod traits;
mod types;

pub use dry_run::DryRunStore;
pub use error::{LabelStoreError, Result};
pub use github::{GITHUB_API_URL, GitHubLabelStore};
pub use traits::LabelStore;
pub use types::{Label, NewLabel, RepoRef, label_key};
