//! Shared analysis pipeline used by every front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! distance derivation -> frame -> OLS fit -> z-scores/flags -> ranking/insights
//!
//! Each call is a pure function of (warehouse rows, request); nothing is
//! cached between requests.

use tracing::info;

use crate::domain::AnalysisRequest;
use crate::error::AnalysisError;
use crate::fit::{FitResult, classify, count_flagged, fit_ols};
use crate::frame::{AnalysisFrame, build_frame};
use crate::geo::resolve_distances;
use crate::io::Warehouse;
use crate::report::{Insights, OutlierRow, rank_outliers, summarize};

/// All computed outputs of a single analysis request.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub request: AnalysisRequest,
    pub frame: AnalysisFrame,
    pub fit: FitResult,
    /// Outlier flag per fitted row, aligned with `fit.used_rows()`.
    pub flags: Vec<bool>,
    pub n_outliers: usize,
    pub ranked: Vec<OutlierRow>,
    pub insights: Insights,
}

/// Execute the full pipeline against the warehouse.
pub fn run_analysis(warehouse: &Warehouse, request: &AnalysisRequest) -> Result<RunOutput, AnalysisError> {
    request.validate()?;

    let lines = warehouse.lines();
    let distances = resolve_distances(lines, warehouse.centroids());
    let frame = build_frame(lines, &distances, request)?;
    if frame.excluded.missing_coordinates > 0 {
        info!(
            "{} {} excluded — missing coordinates",
            frame.excluded.missing_coordinates,
            frame.granularity.display_name()
        );
    }

    analyze_frame(frame, request)
}

/// Fit, score and rank an already built frame.
pub fn analyze_frame(frame: AnalysisFrame, request: &AnalysisRequest) -> Result<RunOutput, AnalysisError> {
    request.validate()?;

    let fit = fit_ols(&frame.distances(), &frame.freight_pcts())?;
    let flags = classify(fit.z_scores(), request.z_threshold);
    let n_outliers = count_flagged(&flags);
    let ranked = rank_outliers(&frame.rows, &fit, &flags, request.top_n);
    let insights = summarize(&fit, &ranked);

    info!(
        rows = fit.n(),
        slope = fit.slope(),
        r_squared = fit.r_squared(),
        outliers = n_outliers,
        threshold = request.z_threshold,
        "analysis complete"
    );

    Ok(RunOutput {
        request: request.clone(),
        frame,
        fit,
        flags,
        n_outliers,
        ranked,
        insights,
    })
}
