//! Mapping label suggestions onto existing or newly created store labels.

use crate::inventory::LabelInventory;
use crate::palette::ColorSource;
use crate::suggestions::Suggestion;
use labeler_store::{LabelStore, NewLabel, RepoRef, label_key};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOrigin {
    /// Present in the store before this run touched it.
    Existing,
    /// Created by this run.
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLabel {
    pub name: String,
    pub origin: LabelOrigin,
}

/// Ordered label names to attach, unique under case-folding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    labels: Vec<PlannedLabel>,
}

impl ReconciliationPlan {
    fn push(&mut self, name: impl Into<String>, origin: LabelOrigin) {
        self.labels.push(PlannedLabel {
            name: name.into(),
            origin,
        });
    }

    fn find(&self, name: &str) -> Option<&PlannedLabel> {
        let key = label_key(name);
        self.labels.iter().find(|l| label_key(&l.name) == key)
    }

    /// Keep the first occurrence of every case-folded name.
    fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        self.labels.retain(|l| seen.insert(label_key(&l.name)));
    }

    pub fn labels(&self) -> &[PlannedLabel] {
        &self.labels
    }

    pub fn names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Matched an inventory label; carries the store's spelling.
    Existing { label: String },
    Created { label: String },
    /// Creation lost a race to another writer; the label is used anyway.
    AlreadyExisted { label: String },
    /// Same case-folded name as an earlier suggestion.
    Duplicate { of: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub candidate: String,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub plan: ReconciliationPlan,
    pub outcomes: Vec<CandidateOutcome>,
}

impl Reconciliation {
    pub fn failures(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.disposition, Disposition::Failed { .. }))
    }
}

pub fn fallback_description(name: &str) -> String {
    format!("Auto-generated label for {name}")
}

pub struct Reconciler<'a> {
    store: &'a dyn LabelStore,
    colors: &'a mut dyn ColorSource,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn LabelStore, colors: &'a mut dyn ColorSource) -> Self {
        Self { store, colors }
    }

    /// Never fails: per-candidate problems are recorded in the outcomes and
    /// the candidate is left out of the plan.
    pub async fn reconcile(
        &mut self,
        repo: &RepoRef,
        candidates: &[Suggestion],
        inventory: &LabelInventory,
    ) -> Reconciliation {
        let mut plan = ReconciliationPlan::default();
        let mut outcomes = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let name = candidate.name.trim();
            if name.is_empty() {
                continue;
            }

            let disposition = if let Some(planned) = plan.find(name) {
                Disposition::Duplicate {
                    of: planned.name.clone(),
                }
            } else if let Some(existing) = inventory.find(name) {
                plan.push(existing.name.clone(), LabelOrigin::Existing);
                Disposition::Existing {
                    label: existing.name.clone(),
                }
            } else {
                self.create(repo, name, candidate.description.as_deref(), &mut plan)
                    .await
            };

            tracing::debug!(candidate = %name, disposition = ?disposition, "reconciled suggestion");
            outcomes.push(CandidateOutcome {
                candidate: name.to_string(),
                disposition,
            });
        }

        plan.dedupe();
        Reconciliation { plan, outcomes }
    }

    async fn create(
        &mut self,
        repo: &RepoRef,
        name: &str,
        description: Option<&str>,
        plan: &mut ReconciliationPlan,
    ) -> Disposition {
        let new_label = NewLabel {
            name: name.to_string(),
            color: self.colors.next_color(),
            description: description
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| fallback_description(name)),
        };

        match self.store.create_label(repo, &new_label).await {
            Ok(created) => {
                let label = if created.name.trim().is_empty() {
                    name.to_string()
                } else {
                    created.name
                };
                tracing::info!(label = %label, color = %new_label.color, "created label");
                plan.push(label.clone(), LabelOrigin::Created);
                Disposition::Created { label }
            }
            Err(e) if e.is_conflict() => {
                let label = self.resolve_conflict(repo, name).await;
                tracing::info!(label = %label, "label was created concurrently; using it");
                plan.push(label.clone(), LabelOrigin::Existing);
                Disposition::AlreadyExisted { label }
            }
            Err(e) => {
                tracing::warn!(label = %name, error = %e, "failed to create label; dropping it");
                Disposition::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Re-list once to pick up the winner's spelling of the name.
    async fn resolve_conflict(&self, repo: &RepoRef, name: &str) -> String {
        match self.store.list_labels(repo).await {
            Ok(labels) => {
                let key = label_key(name);
                labels
                    .into_iter()
                    .find(|l| l.key() == key)
                    .map(|l| l.name)
                    .unwrap_or_else(|| name.to_string())
            }
            Err(e) => {
                tracing::debug!(error = %e, "re-list after conflict failed; keeping suggested name");
                name.to_string()
            }
        }
    }
}
