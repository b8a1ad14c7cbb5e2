//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - opens the warehouse (data-access context) once
//! - runs the analysis pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Command, DistanceArgs};
use crate::domain::{AnalysisBounds, AnalysisRequest, GeoPoint};
use crate::error::{AnalysisError, AppError};
use crate::geo::{CentroidTable, haversine_km};
use crate::io::Warehouse;

pub mod pipeline;

/// Entry point for the `lanes` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);
    crate::config::load_dotenv();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, OutputMode::Full),
        Command::Outliers(args) => handle_analyze(args, OutputMode::OutliersOnly),
        Command::Distance(args) => handle_distance(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    OutliersOnly,
}

/// Log to stderr. `-v`/`-vv` win over `RUST_LOG`; the default is `warn`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_analyze(args: AnalyzeArgs, mode: OutputMode) -> Result<(), AppError> {
    let request = request_from_args(&args);
    request.validate()?;

    let config = crate::config::warehouse_config(args.source.lines.clone(), args.source.geo.clone())?;
    let warehouse = Warehouse::open(&config)?;

    let run = pipeline::run_analysis(&warehouse, &request).map_err(report_analysis_error)?;

    if mode == OutputMode::Full {
        println!("{}", crate::report::format_run_summary(&run, &warehouse.stats()));
    }
    println!("{}", crate::report::format_outlier_table(&run.ranked));

    if let Some(path) = &args.export {
        crate::io::write_outliers_csv(path, &run.ranked)?;
    }
    if let Some(path) = &args.export_fit {
        crate::io::write_fit_json(path, &run)?;
    }

    Ok(())
}

/// Log an analysis failure at the level it deserves and convert it.
///
/// Data-shape problems are user guidance; a degenerate fit means the frame
/// checks were bypassed and is logged as a defect.
fn report_analysis_error(err: AnalysisError) -> AppError {
    if err.is_defect() {
        error!("contract violation between frame and fit: {err}");
    } else {
        warn!("{err}");
    }
    err.into()
}

pub fn request_from_args(args: &AnalyzeArgs) -> AnalysisRequest {
    AnalysisRequest {
        granularity: args.level,
        order_freight: args.order_freight,
        bounds: AnalysisBounds {
            max_distance_km: args.max_km,
            max_freight_pct: args.max_pct,
            min_line_gross: args.min_gross,
        },
        z_threshold: args.z_threshold,
        top_n: args.top,
    }
}

fn handle_distance(args: DistanceArgs) -> Result<(), AppError> {
    let from = parse_coordinates(&args.from);
    let to = parse_coordinates(&args.to);

    // Only load the geo reference when a postal prefix needs resolving.
    let table = if from.is_none() || to.is_none() {
        let path = crate::config::geo_path(args.geo.clone()).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Postal prefixes need a geo reference. Pass --geo <CSV> or set {}.",
                    crate::config::GEO_ENV
                ),
            )
        })?;
        Some(crate::io::load_geo_reference(&path)?.table)
    } else {
        None
    };

    let from = resolve_endpoint(&args.from, from, table.as_ref())?;
    let to = resolve_endpoint(&args.to, to, table.as_ref())?;
    println!("{:.1} km", haversine_km(from, to));
    Ok(())
}

fn resolve_endpoint(raw: &str, parsed: Option<GeoPoint>, table: Option<&CentroidTable>) -> Result<GeoPoint, AppError> {
    if let Some(point) = parsed {
        return Ok(point);
    }
    table
        .and_then(|t| t.lookup(raw))
        .ok_or_else(|| AppError::new(3, format!("Postal prefix '{raw}' not found in the geo reference.")))
}

/// Parse `LAT,LNG`; `None` if `s` is not a valid coordinate pair.
fn parse_coordinates(s: &str) -> Option<GeoPoint> {
    let (lat, lng) = s.split_once(',')?;
    let point = GeoPoint::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    point.is_valid().then_some(point)
}
