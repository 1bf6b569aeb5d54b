//! One labeling run: inventory, prompt, model, parse, reconcile, attach.

use crate::event::IssueContext;
use crate::inventory::LabelInventory;
use crate::palette::ColorSource;
use crate::prompt::{PromptLimits, build_prompt, suggestion_schema};
use crate::reconcile::{CandidateOutcome, Reconciler};
use crate::suggestions::{ParseOutcome, parse_suggestions};
use async_trait::async_trait;
use labeler_llm::{LlmClient, LlmError};
use labeler_store::{LabelStore, LabelStoreError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Start,
    FetchingInventory,
    PromptReady,
    AwaitingModel,
    ParsingResponse,
    Reconciling,
    Attaching,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Start => "start",
            RunStage::FetchingInventory => "fetching_inventory",
            RunStage::PromptReady => "prompt_ready",
            RunStage::AwaitingModel => "awaiting_model",
            RunStage::ParsingResponse => "parsing_response",
            RunStage::Reconciling => "reconciling",
            RunStage::Attaching => "attaching",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to fetch label inventory: {0}")]
    Inventory(#[source] LabelStoreError),

    #[error("model request failed: {0}")]
    Model(#[source] LlmError),

    #[error("model response could not be parsed ({reason}); raw response: {raw}")]
    UnparsableResponse { reason: String, raw: String },

    /// Labels created earlier in the run stay in the store; the run ends in
    /// `RunStage::Failed` instead of `Done`.
    #[error("failed to attach labels: {0}")]
    Attach(#[source] LabelStoreError),
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub issue_number: Option<u64>,
    pub attached: Vec<String>,
    pub outcomes: Vec<CandidateOutcome>,
    pub skipped: bool,
}

impl RunReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Comma-joined attached names; empty when nothing was attached.
    pub fn output(&self) -> String {
        self.attached.join(", ")
    }
}

/// The text-generation seam used by a run.
#[async_trait]
pub trait SuggestionModel: Send + Sync {
    async fn suggest(&self, prompt: &str, schema: Option<&Value>) -> labeler_llm::Result<String>;
}

#[async_trait]
impl SuggestionModel for LlmClient {
    async fn suggest(&self, prompt: &str, schema: Option<&Value>) -> labeler_llm::Result<String> {
        let generation = self.generate(prompt, schema).await?;
        Ok(generation.text)
    }
}

pub struct Labeler {
    store: Arc<dyn LabelStore>,
    model: Arc<dyn SuggestionModel>,
    colors: Box<dyn ColorSource>,
    limits: PromptLimits,
    structured_output: bool,
    stage: RunStage,
}

impl Labeler {
    pub fn new(
        store: Arc<dyn LabelStore>,
        model: Arc<dyn SuggestionModel>,
        colors: Box<dyn ColorSource>,
    ) -> Self {
        Self {
            store,
            model,
            colors,
            limits: PromptLimits::default(),
            structured_output: true,
            stage: RunStage::Start,
        }
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub async fn run(&mut self, issue: Option<IssueContext>) -> Result<RunReport, RunError> {
        let run_id = ulid::Ulid::new();
        let span = tracing::info_span!("labeler_run", run_id = %run_id);
        self.run_inner(issue).instrument(span).await
    }

    async fn run_inner(&mut self, issue: Option<IssueContext>) -> Result<RunReport, RunError> {
        self.stage = RunStage::Start;

        let Some(issue) = issue else {
            tracing::info!("event carries no issue; nothing to label");
            self.advance(RunStage::Done);
            return Ok(RunReport::skipped());
        };
        tracing::info!(repo = %issue.repo, issue_number = issue.number, "labeling issue");

        self.advance(RunStage::FetchingInventory);
        let labels = match self.store.list_labels(&issue.repo).await {
            Ok(labels) => labels,
            Err(e) => return Err(self.fail(RunError::Inventory(e))),
        };
        let inventory = LabelInventory::new(labels);
        tracing::info!(count = inventory.len(), "fetched label inventory");

        let prompt = build_prompt(&issue, &inventory, self.limits);
        self.advance(RunStage::PromptReady);
        tracing::debug!(prompt_chars = prompt.len(), "prompt built");

        self.advance(RunStage::AwaitingModel);
        let schema = self.structured_output.then(suggestion_schema);
        let raw = match self.model.suggest(&prompt, schema.as_ref()).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(RunError::Model(e))),
        };
        tracing::debug!(response = %raw, "model responded");

        self.advance(RunStage::ParsingResponse);
        let suggestions = match parse_suggestions(&raw) {
            ParseOutcome::Parsed(suggestions) => suggestions,
            ParseOutcome::Unparsable { reason } => {
                return Err(self.fail(RunError::UnparsableResponse { reason, raw }));
            }
        };
        tracing::info!(count = suggestions.len(), "parsed label suggestions");

        self.advance(RunStage::Reconciling);
        let reconciliation = Reconciler::new(&*self.store, &mut *self.colors)
            .reconcile(&issue.repo, &suggestions, &inventory)
            .await;
        let names = reconciliation.plan.names();

        if names.is_empty() {
            tracing::info!("no labels to attach");
        } else {
            self.advance(RunStage::Attaching);
            if let Err(e) = self
                .store
                .attach_labels(&issue.repo, issue.number, &names)
                .await
            {
                return Err(self.fail(RunError::Attach(e)));
            }
            tracing::info!(labels = ?names, "attached labels");
        }

        self.advance(RunStage::Done);
        Ok(RunReport {
            issue_number: Some(issue.number),
            attached: names,
            outcomes: reconciliation.outcomes,
            skipped: false,
        })
    }

    fn advance(&mut self, next: RunStage) {
        tracing::info!(from = %self.stage, to = %next, "run stage");
        self.stage = next;
    }

    fn fail(&mut self, err: RunError) -> RunError {
        tracing::error!(stage = %self.stage, error = %err, "run failed");
        self.advance(RunStage::Failed);
        err
    }
}
