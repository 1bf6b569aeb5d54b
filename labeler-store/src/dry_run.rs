use crate::error::Result;
use crate::traits::LabelStore;
use crate::types::{Label, NewLabel, RepoRef};
use async_trait::async_trait;

/// Read-through wrapper that never mutates the wrapped store.
///
/// Listing goes to the inner store; creation echoes the requested label back
/// and attachment only logs what would have happened.
pub struct DryRunStore<S> {
    inner: S,
}

impl<S> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: LabelStore> LabelStore for DryRunStore<S> {
    async fn list_labels(&self, repo: &RepoRef) -> Result<Vec<Label>> {
        self.inner.list_labels(repo).await
    }

    async fn create_label(&self, repo: &RepoRef, label: &NewLabel) -> Result<Label> {
        tracing::info!(
            repo = %repo,
            label = %label.name,
            color = %label.color,
            description = %label.description,
            "dry run: skipping label creation"
        );
        Ok(Label {
            name: label.name.trim().to_string(),
            description: Some(label.description.clone()),
            color: label.color.clone(),
        })
    }

    async fn attach_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        names: &[String],
    ) -> Result<()> {
        tracing::info!(
            repo = %repo,
            issue_number,
            labels = ?names,
            "dry run: skipping label attachment"
        );
        Ok(())
    }
}
