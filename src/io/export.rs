//! Exports: the outlier table as CSV and the full fit as JSON.
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisRequest, ExclusionCounts};
use crate::error::AppError;
use crate::fit::TrendLine;
use crate::report::{Insights, OutlierRow};

/// Schema of the fit JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct FitFile<'a> {
    pub tool: &'static str,
    pub generated_at: String,
    pub request: &'a AnalysisRequest,
    pub rows_considered: usize,
    pub rows_analysed: usize,
    pub excluded: ExclusionCounts,
    pub intercept: f64,
    pub slope: f64,
    pub slope_pp_per_km: f64,
    pub r_squared: f64,
    pub residual_sigma: f64,
    pub trend: TrendLine,
    pub outliers_flagged: usize,
    pub insights: &'a Insights,
    pub outliers: &'a [OutlierRow],
}

/// Write the ranked outlier table to a CSV file.
pub fn write_outliers_csv(path: &Path, rows: &[OutlierRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_outliers(file, rows)
}

/// Write the ranked outlier table as CSV to any writer.
pub fn write_outliers<W: std::io::Write>(out: W, rows: &[OutlierRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    if rows.is_empty() {
        // Serde-driven headers are only emitted with the first record.
        writer
            .write_record([
                "entity_id",
                "order_id",
                "order_item_id",
                "seller_id",
                "product_id",
                "distance_km",
                "freight_pct",
                "fitted",
                "residual",
                "z_score",
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write coefficients, diagnostics and the ranked outliers to a JSON file.
pub fn write_fit_json(path: &Path, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let fit = &run.fit;
    let doc = FitFile {
        tool: "lanes",
        generated_at: chrono::Local::now().to_rfc3339(),
        request: &run.request,
        rows_considered: run.frame.considered,
        rows_analysed: fit.n(),
        excluded: run.frame.excluded,
        intercept: fit.intercept(),
        slope: fit.slope(),
        slope_pp_per_km: fit.slope_pp_per_km(),
        r_squared: fit.r_squared(),
        residual_sigma: fit.residual_sigma(),
        trend: fit.trend(),
        outliers_flagged: run.n_outliers,
        insights: &run.insights,
        outliers: &run.ranked,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}
