//! rankeval CLI
//!
//! Command-line interface for ranking agreement evaluation.
//!
//! ## Usage
//!
//! ```bash
//! # Score the "pred" ranks against the gold "rank" attribute
//! rankeval evaluate judgments.jcml pred rank
//!
//! # Only two metrics, JSON output with per-group detail
//! rankeval evaluate judgments.json pred rank --metrics kendall_tau,ndcg --format json --per-group
//!
//! # List available metrics
//! rankeval metrics
//! ```
//!
//! Logging goes to stderr; `RANKEVAL_LOG` or `RUST_LOG` override `-v`/`-q`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rankeval::{
    load_groups, CorpusReport, EvalConfig, EvaluationRunner, MetricCatalog, RankAttributes,
    TiePolicy, TieResolver,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Report output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Tie policy for positional metrics
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TiePolicyArg {
    /// One position per distinct rank
    Minimize,
    /// Lowest of the tied positions
    Floor,
    /// Highest of the tied positions
    Ceiling,
    /// Mean of the tied positions
    Middle,
}

impl From<TiePolicyArg> for TiePolicy {
    fn from(arg: TiePolicyArg) -> Self {
        match arg {
            TiePolicyArg::Minimize => Self::Minimize,
            TiePolicyArg::Floor => Self::Floor,
            TiePolicyArg::Ceiling => Self::Ceiling,
            TiePolicyArg::Middle => Self::Middle,
        }
    }
}

#[derive(Parser)]
#[command(name = "rankeval")]
#[command(version)]
#[command(about = "Evaluate predicted rankings against gold rankings", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a judgment file
    Evaluate {
        /// Path to the judgment document (JCML or JSON)
        file: PathBuf,

        /// Attribute holding the predicted rank
        predicted_attr: String,

        /// Attribute holding the gold rank
        gold_attr: String,

        /// Attribute holding a numeric gold quality (used by delta_avg)
        #[arg(long)]
        quality_attr: Option<String>,

        /// Comma-separated metric names (default: all)
        #[arg(short, long, value_delimiter = ',')]
        metrics: Vec<String>,

        /// JSON evaluation config
        #[arg(short, long, env = "RANKEVAL_CONFIG")]
        config: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include per-group results
        #[arg(long)]
        per_group: bool,

        /// Leave predicted ties on gold-ordered pairs out instead of counting them as discordant
        #[arg(long)]
        no_penalize_predicted_ties: bool,

        /// nDCG cutoff
        #[arg(long)]
        ndcg_cutoff: Option<usize>,

        /// Tie policy for positional metrics
        #[arg(long, value_enum)]
        tie_policy: Option<TiePolicyArg>,
    },

    /// List available metrics
    Metrics,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = std::env::var("RANKEVAL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    // A subscriber may already be set when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Evaluate {
            file,
            predicted_attr,
            gold_attr,
            quality_attr,
            metrics,
            config,
            format,
            per_group,
            no_penalize_predicted_ties,
            ndcg_cutoff,
            tie_policy,
        } => {
            let mut eval_config = match &config {
                Some(path) => EvalConfig::from_json_file(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?,
                None => EvalConfig::default(),
            };
            if no_penalize_predicted_ties {
                eval_config.penalize_predicted_ties = false;
            }
            if ndcg_cutoff.is_some() {
                eval_config.ndcg_cutoff = ndcg_cutoff;
            }
            if let Some(policy) = tie_policy {
                eval_config.tie_policy = policy.into();
            }
            eval_config.validate()?;

            let mut attributes = RankAttributes::new(gold_attr, predicted_attr)?;
            if let Some(quality) = quality_attr {
                attributes = attributes.with_quality(quality)?;
            }

            let report = run_evaluate(&file, &attributes, &eval_config, &metrics, per_group)?;
            match format {
                OutputFormat::Text => print_report(&report),
                OutputFormat::Json => println!("{}", report.to_json()?),
            }
        }
        Commands::Metrics => run_metrics(),
    }

    Ok(())
}

fn run_evaluate(
    file: &Path,
    attributes: &RankAttributes,
    config: &EvalConfig,
    metrics: &[String],
    per_group: bool,
) -> Result<CorpusReport> {
    let corpus = load_groups(file, attributes)
        .with_context(|| format!("failed to load judgments from {}", file.display()))?;

    let mut catalog = MetricCatalog::standard(config);
    if !metrics.is_empty() {
        catalog = catalog.select(metrics)?;
    }

    let runner = EvaluationRunner::new(catalog)
        .with_resolver(TieResolver::new(config.tie_policy))
        .with_penalize_predicted_ties(config.penalize_predicted_ties)
        .with_group_results(per_group);

    runner
        .run_corpus(&corpus)
        .with_context(|| format!("evaluation of {} failed", file.display()))
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.4}"))
}

fn print_report(report: &CorpusReport) {
    println!(
        "Evaluated {}/{} groups ({} candidate(s) rejected)",
        report.groups_usable, report.groups_total, report.candidates_rejected
    );
    println!();
    println!(
        "{:<22} {:>10} {:>6} {:>8}  Weighting",
        "Metric", "Value", "Used", "Skipped"
    );
    for summary in report.metrics.values() {
        println!(
            "{:<22} {:>10} {:>6} {:>8}  {}",
            summary.metric,
            format_value(summary.value),
            summary.groups_used,
            summary.groups_skipped,
            summary.weighting
        );
        for (reason, count) in &summary.skip_reasons {
            println!("{:<22} skipped: {reason} ({count})", "");
        }
    }

    let coverage = &report.coverage;
    let pairs = &coverage.concordance;
    println!();
    println!(
        "Pairs: {} concordant, {} discordant, {} gold ties, {} predicted ties ({:.1}%)",
        pairs.concordant,
        pairs.discordant,
        pairs.gold_ties,
        pairs.predicted_ties,
        coverage.predicted_ties_percent
    );
    println!(
        "Pooled tau: {} (p = {})",
        format_value(coverage.tau),
        format_value(coverage.tau_prob)
    );
    println!(
        "Segment tau average: {} ({} group(s) with predicted ties, {:.1}%)",
        format_value(coverage.tau_avg_seg),
        coverage.groups_with_predicted_ties,
        coverage.sentence_ties_percent
    );

    if !report.best_pick.is_empty() {
        println!();
        println!("Best pick gold rank:");
        for bin in report.best_pick.bins() {
            println!("  {}: {} ({:.1}%)", bin.gold_rank, bin.count, bin.percent);
        }
    }

    if !report.notes.is_empty() {
        println!();
        println!("Notes:");
        for note in &report.notes {
            println!("  - {note}");
        }
    }

    if !report.groups.is_empty() {
        println!();
        println!("Groups:");
        for group in &report.groups {
            let values: Vec<String> = group
                .results
                .iter()
                .map(|r| format!("{}={}", r.metric, format_value(r.value())))
                .collect();
            println!(
                "  {} ({}/{} ranked): {}",
                group.group_id,
                group.ranked,
                group.size,
                values.join(" ")
            );
        }
    }
}

fn run_metrics() {
    let catalog = MetricCatalog::standard(&EvalConfig::default());
    println!("Available metrics");
    println!("=================");
    for (metric, weighting) in catalog.entries() {
        println!(
            "  {:<22} [{weighting}] {}",
            metric.name(),
            metric.description()
        );
    }
}
