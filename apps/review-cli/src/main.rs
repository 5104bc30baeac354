//! Review CLI
//!
//! Loads a case dataset, walks the seven review stages on the async runtime
//! and prints the view-model of every stage as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use review_engine::{
    Action, ReviewConfig, ReviewDataset, ReviewSession, SessionRuntime, Stage,
};
use review_types::Severity;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "review-cli")]
#[command(version, about = "Scripted walkthrough of the compliance review workflow")]
struct Args {
    /// Case dataset (JSON)
    #[arg(short, long, default_value = "data/sample_case.json")]
    dataset: PathBuf,

    /// Session configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Toggle an audit before running (repeatable)
    #[arg(long = "toggle-audit", value_name = "ID")]
    toggle_audits: Vec<String>,

    /// Restrict the findings list to a severity (repeatable)
    #[arg(long = "filter", value_name = "LEVEL")]
    filters: Vec<Severity>,

    /// Seed for the progress increments, overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Print one JSON object per line instead of pretty output
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the view-models, logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("review_engine=info,review_cli=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting review-cli v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => ReviewConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReviewConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let dataset = ReviewDataset::from_file(&args.dataset)
        .with_context(|| format!("loading dataset {}", args.dataset.display()))?;
    for warning in dataset.warnings() {
        tracing::warn!(
            origin = ?warning.origin,
            record = warning.record,
            reason = %warning.reason,
            "Input degraded"
        );
    }

    let mut runtime = SessionRuntime::new(ReviewSession::new(Arc::new(dataset), &config));
    walkthrough(&mut runtime, &args).await
}

async fn walkthrough(runtime: &mut SessionRuntime, args: &Args) -> Result<()> {
    print_view(runtime, args.compact)?;

    runtime.dispatch(Action::StartAnalysis);
    print_view(runtime, args.compact)?;
    if !runtime.run_until(Stage::ReviewResults).await {
        bail!("analysis stopped before reaching the results stage");
    }
    print_view(runtime, args.compact)?;

    runtime.dispatch(Action::ProceedToAudits);
    for id in &args.toggle_audits {
        runtime.dispatch(Action::ToggleAudit(id.clone()));
    }
    print_view(runtime, args.compact)?;

    runtime.dispatch(Action::RunSelectedAudits);
    if runtime.current_stage() != Stage::RunAudits {
        bail!("no audits selected");
    }
    print_view(runtime, args.compact)?;
    if !runtime.run_until(Stage::ReviewFindings).await {
        bail!("audits stopped before reaching the findings stage");
    }

    for level in &args.filters {
        runtime.dispatch(Action::ToggleSeverityFilter(*level));
    }
    let first_boxed = runtime
        .session()
        .dataset()
        .findings()
        .iter()
        .find(|f| f.box_id.is_some())
        .map(|f| f.id.clone());
    if let Some(finding_id) = first_boxed {
        let focus = runtime.dispatch(Action::SelectFinding {
            finding_id,
            box_id: None,
        });
        tracing::info!(?focus, "Selected first located finding");
    }
    print_view(runtime, args.compact)?;

    runtime.dispatch(Action::ExportReport);
    print_view(runtime, args.compact)?;

    tracing::info!(
        max_unlocked = runtime.session().stages().max_unlocked().number(),
        "Walkthrough complete"
    );
    Ok(())
}

fn print_view(runtime: &SessionRuntime, compact: bool) -> Result<()> {
    let view = runtime.view();
    let json = if compact {
        serde_json::to_string(&view)
    } else {
        serde_json::to_string_pretty(&view)
    }
    .context("serializing view-model")?;
    println!("{}", json);
    Ok(())
}
