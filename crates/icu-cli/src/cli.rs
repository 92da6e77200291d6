//! CLI argument definitions for the ICU feature pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use icu_model::Scorer;

#[derive(Parser)]
#[command(
    name = "icu-features",
    version,
    about = "ICU mortality features - derive, encode and select features from encounter data",
    long_about = "Derive model-ready features from a denormalized ICU encounter table.\n\n\
                  Computes age and stay durations, maps diagnosis codes to benchmark\n\
                  categories, bins continuous values into quartiles, one-hot encodes\n\
                  categorical columns and ranks every feature against the outcome."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient-level values (encounter identifiers) in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the feature pipeline on an encounter table.
    Run(RunArgs),

    /// List the categories of a diagnosis taxonomy.
    Categories(CategoriesArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Denormalized encounter CSV (one row per encounter and diagnosis).
    #[arg(value_name = "ENCOUNTERS_CSV")]
    pub input: PathBuf,

    /// Diagnosis taxonomy document (YAML or JSON).
    #[arg(long = "taxonomy", value_name = "PATH")]
    pub taxonomy: PathBuf,

    /// Directory receiving features.csv, feature_scores.csv and outcomes.csv.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Pipeline configuration (TOML). Flags below override its values.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep the N highest-scoring features, or `all` to keep every feature.
    #[arg(
        long = "top-k",
        value_name = "N|all",
        value_parser = parse_top_k,
        conflicts_with_all = ["p_value", "min_score"]
    )]
    pub top_k: Option<TopK>,

    /// Keep features whose p-value is strictly below the threshold.
    #[arg(long = "p-value", value_name = "THRESHOLD", conflicts_with = "min_score")]
    pub p_value: Option<f64>,

    /// Keep features whose score is at least the threshold.
    #[arg(long = "min-score", value_name = "SCORE")]
    pub min_score: Option<f64>,

    /// Statistic used to rank features.
    #[arg(long = "scorer", value_enum)]
    pub scorer: Option<ScorerArg>,

    /// Skip zero-variance features instead of failing the run.
    #[arg(long = "skip-degenerate")]
    pub skip_degenerate: bool,

    /// Ages above this many years are treated as missing.
    #[arg(long = "max-age", value_name = "YEARS")]
    pub max_age: Option<i64>,

    /// Score and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct CategoriesArgs {
    /// Diagnosis taxonomy document (YAML or JSON).
    #[arg(value_name = "TAXONOMY")]
    pub taxonomy: PathBuf,
}

/// Parsed `--top-k` value; `None` keeps every feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK(pub Option<usize>);

fn parse_top_k(value: &str) -> Result<TopK, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(TopK(None));
    }
    match value.parse::<usize>() {
        Ok(0) => Err("k must be at least 1".to_string()),
        Ok(k) => Ok(TopK(Some(k))),
        Err(_) => Err(format!("expected a positive integer or `all`, got `{value}`")),
    }
}

/// CLI scorer choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum ScorerArg {
    Chi2,
    MutualInfo,
}

impl From<ScorerArg> for Scorer {
    fn from(value: ScorerArg) -> Self {
        match value {
            ScorerArg::Chi2 => Scorer::Chi2,
            ScorerArg::MutualInfo => Scorer::MutualInfo,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
