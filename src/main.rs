use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use neurotab::config::PipelineConfig;
use neurotab::session::{MemorySessionStore, SessionStore, SessionSummary};
use neurotab::storage::FeatureTable;
use neurotab::Pipeline;

/// Build a cross-session feature table and score a trial-outcome forest
#[derive(Parser, Debug)]
#[command(name = "neurotab", version, long_about = None)]
struct Args {
    /// Directory of session JSON files
    #[arg(short, long)]
    sessions: PathBuf,

    /// Pipeline config JSON (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the feature table to this Parquet file
    #[arg(long)]
    table_out: Option<PathBuf>,

    /// Write the evaluation report to this JSON file
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Seed for the split and the forest (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of trees (overrides the config file)
    #[arg(long)]
    trees: Option<usize>,

    /// Top-ranked features to print
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let mut builder = Pipeline::builder().config(config);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(trees) = args.trees {
        builder = builder.trees(trees);
    }
    let pipeline = builder.build()?;

    let store = MemorySessionStore::load_json_dir(&args.sessions)
        .with_context(|| format!("loading sessions from {}", args.sessions.display()))?;
    for session in store.sessions() {
        let summary = SessionSummary::from_session(session);
        info!(
            session = summary.session_id,
            mouse = %summary.mouse_name,
            date = %summary.date_experiment,
            neurons = summary.neurons,
            areas = summary.areas,
            trials = summary.trials,
            success_rate = summary.success_rate,
            "Session loaded"
        );
    }

    let output = pipeline.run(&store)?;

    if let Some(path) = &args.table_out {
        FeatureTable::from_dataset(&output.dataset)?
            .write_parquet(path)
            .with_context(|| format!("writing feature table {}", path.display()))?;
    }
    if let Some(path) = &args.report_out {
        std::fs::write(path, output.report.to_json_pretty()?)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    let report = &output.report;
    println!(
        "{} rows x {} features from {} sessions ({} areas)",
        output.dataset.len(),
        output.dataset.schema().width(),
        output.stats.sessions,
        output.vocabulary.len()
    );
    println!(
        "training {} / validation {}",
        report.training_rows, report.validation_rows
    );
    println!("accuracy {:.4}", report.accuracy);
    if let Some(recall) = report.recall_success {
        println!("recall (success) {recall:.4}");
    }
    if let Some(recall) = report.recall_failure {
        println!("recall (failure) {recall:.4}");
    }
    print!("{}", report.confusion);
    for feature in output.model.feature_importance().top_k(args.top) {
        println!("{:>3}. {:<32} {:.5}", feature.rank, feature.name, feature.score);
    }

    Ok(())
}
