//! Command-line parsing for the freight-vs-distance screen.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the analysis code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{Granularity, OrderFreight};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lanes", version, about = "Freight % vs distance regression and outlier screen")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit freight % against distance, print KPIs, insights and the outlier table.
    Analyze(AnalyzeArgs),
    /// Print the outlier table only (useful for scripting).
    Outliers(AnalyzeArgs),
    /// Great-circle distance between two points or postal prefixes.
    Distance(DistanceArgs),
}

/// Where the warehouse exports live. Falls back to `LANES_LINES_CSV` / `LANES_GEO_CSV`.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Freight line export (CSV).
    #[arg(long, value_name = "CSV")]
    pub lines: Option<PathBuf>,

    /// Postal prefix geo reference (CSV). Optional when lines carry `distance_km`.
    #[arg(long, value_name = "CSV")]
    pub geo: Option<PathBuf>,
}

/// Options shared by `analyze` and `outliers`.
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Analysis level.
    #[arg(short = 'l', long, value_enum, default_value_t = Granularity::Line)]
    pub level: Granularity,

    /// How order-level freight % is rolled up (order level only).
    #[arg(long, value_enum, default_value_t = OrderFreight::Ratio)]
    pub order_freight: OrderFreight,

    /// Max distance (km) to include.
    #[arg(long, default_value_t = 1500.0)]
    pub max_km: f64,

    /// Max freight % (as a fraction, 1.0 = 100%) to include.
    #[arg(long, default_value_t = 1.0)]
    pub max_pct: f64,

    /// Rows need merchandise value strictly above this.
    #[arg(long, default_value_t = 0.0)]
    pub min_gross: f64,

    /// Outlier threshold on |z|.
    #[arg(short = 'z', long = "threshold", default_value_t = 2.5)]
    pub z_threshold: f64,

    /// Show top-N outliers by |z|.
    #[arg(long, default_value_t = 50)]
    pub top: usize,

    /// Export the outlier table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fit (coefficients, diagnostics, outliers) to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,
}

/// Options for `distance`.
#[derive(Debug, Args, Clone)]
pub struct DistanceArgs {
    /// Origin: `LAT,LNG` or a postal prefix (needs a geo reference).
    #[arg(long, allow_hyphen_values = true)]
    pub from: String,

    /// Destination: `LAT,LNG` or a postal prefix (needs a geo reference).
    #[arg(long, allow_hyphen_values = true)]
    pub to: String,

    /// Postal prefix geo reference (CSV). Falls back to `LANES_GEO_CSV`.
    #[arg(long, value_name = "CSV")]
    pub geo: Option<PathBuf>,
}
