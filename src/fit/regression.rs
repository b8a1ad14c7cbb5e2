//! Single-predictor OLS fit.
//!
//! Given distances `x_i` and freight percentages `y_i` we solve
//!
//! ```text
//! minimize Σ (y_i - a - b x_i)^2
//! ```
//!
//! through the SVD least-squares solver, then derive per-row fitted values,
//! residuals, R², the residual sigma (`n - 2` degrees of freedom) and z-scores.
//!
//! A `FitResult` is immutable once built; concurrent readers need no locking.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Axis};
use crate::fit::MIN_FIT_POINTS;
use crate::fit::outliers::standardize;
use crate::math::{has_variation, solve_least_squares, std_dev};

/// Slack below zero tolerated on R² before it is treated as a defect.
const R2_TOLERANCE: f64 = 1e-9;

/// Fitted trend evaluated at the ends of the observed distance range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// Output of one OLS fit.
///
/// Per-row vectors are aligned with `used_rows`, the indices of the input rows
/// that entered the fit (non-finite pairs are skipped).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    intercept: f64,
    slope: f64,
    r_squared: f64,
    residual_sigma: f64,
    used_rows: Vec<usize>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    z_scores: Vec<f64>,
    trend: TrendLine,
}

impl FitResult {
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Change in freight fraction per km.
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Slope in percentage points per km.
    pub fn slope_pp_per_km(&self) -> f64 {
        self.slope * 100.0
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn residual_sigma(&self) -> f64 {
        self.residual_sigma
    }

    pub fn n(&self) -> usize {
        self.used_rows.len()
    }

    pub fn used_rows(&self) -> &[usize] {
        &self.used_rows
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn z_scores(&self) -> &[f64] {
        &self.z_scores
    }

    pub fn trend(&self) -> TrendLine {
        self.trend
    }
}

/// Fit `y = a + b x`.
pub fn fit_ols(x: &[f64], y: &[f64]) -> Result<FitResult, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::DegenerateFit(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }

    let used_rows: Vec<usize> = (0..x.len())
        .filter(|&i| x[i].is_finite() && y[i].is_finite())
        .collect();
    let n = used_rows.len();
    if n < MIN_FIT_POINTS {
        return Err(AnalysisError::InsufficientData {
            usable: n,
            required: MIN_FIT_POINTS,
        });
    }

    let xs: Vec<f64> = used_rows.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = used_rows.iter().map(|&i| y[i]).collect();
    if !has_variation(&xs) {
        return Err(AnalysisError::NoSignal { axis: Axis::Distance });
    }

    let design = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { xs[r] });
    let target = DVector::from_column_slice(&ys);
    // Distances that differ only by rounding noise leave the design rank
    // deficient; that is missing signal, not a defect.
    let Some(beta) = solve_least_squares(&design, &target) else {
        debug!(n, "distance column collinear with the intercept");
        return Err(AnalysisError::NoSignal { axis: Axis::Distance });
    };
    let (intercept, slope) = (beta[0], beta[1]);

    let fitted: Vec<f64> = xs.iter().map(|xi| intercept + slope * xi).collect();
    let residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    if fitted.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::DegenerateFit("non-finite fitted value".to_string()));
    }

    let y_mean = ys.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = ys.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    if !has_variation(&ys) || ss_tot <= 0.0 {
        return Err(AnalysisError::DegenerateFit(
            "freight % has zero total variance; the frame variance check was bypassed".to_string(),
        ));
    }
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let r_squared = 1.0 - ss_res / ss_tot;
    if !(r_squared.is_finite() && r_squared >= -R2_TOLERANCE && r_squared <= 1.0 + R2_TOLERANCE) {
        return Err(AnalysisError::DegenerateFit(format!("R² out of range: {r_squared}")));
    }

    let residual_sigma = std_dev(&residuals, 2)
        .ok_or_else(|| AnalysisError::DegenerateFit("no residual degrees of freedom".to_string()))?;
    let z_scores = standardize(&residuals, residual_sigma);

    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let trend = TrendLine {
        x_min,
        y_min: intercept + slope * x_min,
        x_max,
        y_max: intercept + slope * x_max,
    };

    debug!(n, intercept, slope, r_squared, residual_sigma, "ols fit");

    Ok(FitResult {
        intercept,
        slope,
        r_squared,
        residual_sigma,
        used_rows,
        fitted,
        residuals,
        z_scores,
        trend,
    })
}
