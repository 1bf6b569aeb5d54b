//! CLI command handlers.

use crate::config::LabelerConfig;
use crate::event::load_issue;
use crate::inventory::LabelInventory;
use crate::orchestrator::{Labeler, RunReport};
use crate::output::write_step_output;
use crate::palette::{ColorSource, FixedColor, RandomColors};
use crate::prompt::{PromptLimits, build_prompt};
use crate::reconcile::Disposition;
use anyhow::Result;
use labeler_llm::LlmClient;
use labeler_store::{DryRunStore, GitHubLabelStore, LabelStore, RepoRef};
use std::path::Path;
use std::sync::Arc;

/// Label the issue carried by the event. An event without an issue is a
/// successful no-op and needs no credentials.
pub async fn run(
    config_path: Option<&Path>,
    event_path: Option<&Path>,
    repository: Option<&str>,
    dry_run: bool,
    step_output: Option<&Path>,
) -> Result<()> {
    let cfg = LabelerConfig::load(config_path).await?;
    let Some(issue) = load_issue(event_path, repository).await? else {
        tracing::info!("event carries no issue; nothing to label");
        return publish(&RunReport::skipped(), step_output).await;
    };

    let store = label_store(&cfg, dry_run)?;
    let model = model_client(&cfg)?;
    tracing::info!(
        model = %model.model(),
        provider = ?model.provider(),
        dry_run,
        "labeler configured"
    );

    let mut labeler = Labeler::new(store, Arc::new(model), color_source(&cfg))
        .with_limits(limits(&cfg))
        .with_structured_output(cfg.model.structured_output);
    let report = labeler.run(Some(issue)).await?;

    for outcome in &report.outcomes {
        if let Disposition::Failed { reason } = &outcome.disposition {
            tracing::warn!(label = %outcome.candidate, %reason, "label was not applied");
        }
    }
    publish(&report, step_output).await
}

/// Report on stdout and, in CI, as the `labels` step output.
async fn publish(report: &RunReport, step_output: Option<&Path>) -> Result<()> {
    let output = report.output();
    tracing::info!(
        issue_number = ?report.issue_number,
        skipped = report.skipped,
        labels = %output,
        "run complete"
    );
    println!("{output}");
    if let Some(path) = step_output {
        write_step_output(path, "labels", &output).await?;
    }
    Ok(())
}

/// Print the prompt a run would send, without calling the model.
pub async fn prompt(
    config_path: Option<&Path>,
    event_path: Option<&Path>,
    repository: Option<&str>,
) -> Result<()> {
    let cfg = LabelerConfig::load(config_path).await?;
    let Some(issue) = load_issue(event_path, repository).await? else {
        return Err(anyhow::anyhow!("event does not carry an issue"));
    };

    let store = label_store(&cfg, true)?;
    let inventory = LabelInventory::new(store.list_labels(&issue.repo).await?);
    println!("{}", build_prompt(&issue, &inventory, limits(&cfg)));
    Ok(())
}

pub async fn doctor(config_path: Option<&Path>, repository: Option<&str>) -> Result<()> {
    let cfg = LabelerConfig::load(config_path).await?;
    let store = label_store(&cfg, true)?;
    cfg.model_api_key()?;
    tracing::info!(
        model = %cfg.model.name,
        provider = ?cfg.provider(),
        structured_output = cfg.model.structured_output,
        max_existing = cfg.labels.max_existing,
        max_new = cfg.labels.max_new,
        "config ok"
    );

    match repository.map(str::trim).filter(|r| !r.is_empty()) {
        Some(repository) => {
            let repo: RepoRef = repository.parse()?;
            let labels = store.list_labels(&repo).await?;
            tracing::info!(repo = %repo, labels = labels.len(), "label store reachable");
        }
        None => {
            tracing::info!("no repository given; skipping label store check");
        }
    }
    Ok(())
}

fn label_store(cfg: &LabelerConfig, dry_run: bool) -> Result<Arc<dyn LabelStore>> {
    let token = cfg.github_token()?;
    let store = GitHubLabelStore::new(&token, cfg.github.api_url.as_deref())?;
    if dry_run {
        tracing::info!("dry run: labels will not be created or attached");
        return Ok(Arc::new(DryRunStore::new(store)));
    }
    Ok(Arc::new(store))
}

fn model_client(cfg: &LabelerConfig) -> Result<LlmClient> {
    let key = cfg.model_api_key()?;
    let client = LlmClient::new(&key, &cfg.model.name);
    Ok(match cfg.model.api_url.as_deref() {
        Some(url) => client.with_base_url(url),
        None => client,
    })
}

fn color_source(cfg: &LabelerConfig) -> Box<dyn ColorSource> {
    match cfg.labels.color.as_deref() {
        Some(color) => Box::new(FixedColor::new(color)),
        None => Box::new(RandomColors::new()),
    }
}

fn limits(cfg: &LabelerConfig) -> PromptLimits {
    PromptLimits {
        max_existing: cfg.labels.max_existing,
        max_new: cfg.labels.max_new,
    }
}
