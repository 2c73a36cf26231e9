//! Recsys Tracker - command line front end
//!
//! Scores recommendation logs saved by a tracker against feedback logs, and
//! summarises what a recommendation log contains.

use anyhow::Context;
use clap::{Parser, Subcommand};
use recsys_tracker_core::{
    evaluation::{mean_response_time, median_response_time},
    storage, MetricsReport, TrackerConfig,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "recsys-tracker")]
#[command(about = "Evaluate recorded recommender system logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (RECSYS__* environment variables override it)
    #[arg(short, long, env = "RECSYS_CONFIG")]
    config: Option<PathBuf>,

    /// Set log level (overrides logging.level from the configuration)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every log-derivable metric
    Evaluate {
        /// Recommendation log written by a tracker
        #[arg(short, long)]
        recommendations: PathBuf,

        /// Feedback log; without it only latency metrics are defined
        #[arg(short, long)]
        feedback: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarise a recommendation log
    Inspect {
        /// Recommendation log written by a tracker
        #[arg(short, long)]
        recommendations: PathBuf,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn evaluate(
    config: &TrackerConfig,
    recommendations_path: &Path,
    feedback_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let (name, recommendations) = storage::load_recommendations(recommendations_path)
        .with_context(|| format!("Failed to load {}", recommendations_path.display()))?;

    let feedback = match feedback_path {
        Some(path) => storage::load_feedback(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Vec::new(),
    };

    let report = MetricsReport::compute(&recommendations, &feedback, &config.evaluation)
        .context("Failed to evaluate logs")?;
    info!("Evaluated {} lists of {}", report.recommendation_lists, name);

    if json {
        let body = serde_json::json!({ "tracker": name, "report": report });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", name);
        print!("{}", report);
    }
    Ok(())
}

fn inspect(recommendations_path: &Path) -> anyhow::Result<()> {
    let (name, recommendations) = storage::load_recommendations(recommendations_path)
        .with_context(|| format!("Failed to load {}", recommendations_path.display()))?;

    let users: HashSet<_> = recommendations.iter().map(|rec| rec.user_id).collect();
    let items: usize = recommendations.iter().map(|rec| rec.items.len()).sum();

    println!("Tracker:        {}", name);
    println!("Lists:          {}", recommendations.len());
    println!("Users:          {}", users.len());
    println!("Items served:   {}", items);
    if let (Some(first), Some(last)) = (
        recommendations.iter().map(|rec| rec.at_time).min(),
        recommendations.iter().map(|rec| rec.at_time).max(),
    ) {
        println!("Span:           {} .. {}", first.to_rfc3339(), last.to_rfc3339());
    }
    println!(
        "Response (ms):  mean {:.2}, median {:.2}",
        mean_response_time(&recommendations),
        median_response_time(&recommendations)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = TrackerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let level = parse_level(cli.log_level.as_deref().unwrap_or(&config.logging.level));
    let filter = EnvFilter::new(format!(
        "recsys_tracker={},recsys_tracker_core={}",
        level.as_str().to_lowercase(),
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Recsys Tracker v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Evaluate {
            recommendations,
            feedback,
            json,
        } => evaluate(&config, &recommendations, feedback.as_deref(), json),
        Commands::Inspect { recommendations } => inspect(&recommendations),
    }
}
