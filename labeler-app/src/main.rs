//! Issue labeler binary.
//!
//! Reads the triggering issue from the CI event payload, asks a model for
//! label suggestions, creates missing labels and attaches the result.

mod commands;
mod config;
mod event;
mod inventory;
mod orchestrator;
mod output;
mod palette;
mod prompt;
mod reconcile;
mod suggestions;
#[cfg(test)]
mod testing;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "issue-labeler",
    version,
    about = "Label GitHub issues with model suggestions"
)]
struct Cli {
    /// Optional TOML config file; environment variables take precedence.
    #[arg(long, global = true, env = "LABELER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Label the issue from the event payload (default).
    Run(RunArgs),
    /// Print the prompt that would be sent to the model.
    Prompt(EventArgs),
    /// Validate config and check the label store is reachable.
    Doctor {
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Option<String>,
    },
}

#[derive(Debug, Args)]
struct EventArgs {
    /// Path to the triggering event payload.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event: Option<PathBuf>,

    /// owner/name used when the payload lacks repository details.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    event: EventArgs,

    /// Log label creation and attachment instead of performing them.
    #[arg(long, env = "LABELER_DRY_RUN")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let step_output = std::env::var_os("GITHUB_OUTPUT")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let command = if let Some(command) = cli.command {
        command
    } else {
        Command::Run(cli.run)
    };

    match command {
        Command::Run(args) => {
            commands::run(
                config,
                args.event.event.as_deref(),
                args.event.repository.as_deref(),
                args.dry_run,
                step_output.as_deref(),
            )
            .await
        }
        Command::Prompt(args) => {
            commands::prompt(config, args.event.as_deref(), args.repository.as_deref()).await
        }
        Command::Doctor { repository } => commands::doctor(config, repository.as_deref()).await,
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new(
            "info,issue_labeler=debug,labeler_app=debug,labeler_llm=debug,labeler_store=debug",
        ),
    };
    let log_format = std::env::var("LABELER_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    // stdout carries the run report.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported LABELER_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        tracing::error!(
            thread = thread.name().unwrap_or("unnamed"),
            location = ?info.location().map(|l| (l.file(), l.line())),
            payload = panic_message(info.payload()),
            "issue-labeler panicked; labels may be partially applied"
        );
        default_hook(info);
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_runs_with_flags() {
        let cli = Cli::try_parse_from([
            "issue-labeler",
            "--event",
            "/tmp/event.json",
            "--repository",
            "octo-org/hello-world",
            "--dry-run",
        ])
        .expect("parse bare flags");
        assert!(cli.command.is_none());
        assert!(cli.run.dry_run);
        assert_eq!(
            cli.run.event.repository.as_deref(),
            Some("octo-org/hello-world")
        );
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from([
            "issue-labeler",
            "--config",
            "labeler.toml",
            "prompt",
            "--event",
            "e.json",
        ])
        .expect("parse prompt");
        assert_eq!(cli.config, Some(PathBuf::from("labeler.toml")));
        match cli.command {
            Some(Command::Prompt(args)) => assert_eq!(args.event, Some(PathBuf::from("e.json"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_config_reaches_every_subcommand() {
        for args in [
            &["issue-labeler", "--config", "x.toml", "doctor"][..],
            &["issue-labeler", "doctor", "--config", "x.toml"][..],
            &["issue-labeler", "--config", "x.toml", "run", "--dry-run"][..],
            &["issue-labeler", "--config", "x.toml"][..],
        ] {
            let cli = Cli::try_parse_from(args.iter().copied()).expect("parse with config");
            assert_eq!(cli.config, Some(PathBuf::from("x.toml")), "args: {args:?}");
        }
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("label store gone"));
        assert_eq!(panic_message(payload.as_ref()), "label store gone");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string payload>");
    }
}
