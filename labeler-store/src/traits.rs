use crate::error::Result;
use crate::types::{Label, NewLabel, RepoRef};
use async_trait::async_trait;

/// The three primitives the labeler needs from a label store.
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// Every label currently defined in the repository.
    async fn list_labels(&self, repo: &RepoRef) -> Result<Vec<Label>>;

    /// Create a label. Fails with `LabelStoreError::Conflict` when a label
    /// with the same case-folded name already exists.
    async fn create_label(&self, repo: &RepoRef, label: &NewLabel) -> Result<Label>;

    /// Add `names` to the issue, leaving its other labels in place.
    async fn attach_labels(&self, repo: &RepoRef, issue_number: u64, names: &[String])
    -> Result<()>;
}
