//! Error types.
//!
//! Two layers:
//!
//! - `AnalysisError`: typed failures of a single analysis request (filters too
//!   tight, not enough rows, internal consistency defects).
//! - `AppError`: process-level error carrying the exit code the binary returns.
//!
//! Exit codes:
//! - `2` configuration, I/O or invalid request parameters
//! - `3` data-shape guidance (relax the filters and retry)
//! - `4` internal consistency defect

use thiserror::Error;

/// Which axis of the analysis frame lacked variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Distance,
    FreightPct,
}

impl Axis {
    pub fn label(self) -> &'static str {
        match self {
            Axis::Distance => "distance_km",
            Axis::FreightPct => "freight_pct",
        }
    }
}

/// Failure of one analysis request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The filtered rows have no variation on one axis; a regression is meaningless.
    #[error(
        "Not enough variation in {} after filtering to fit a regression. Relax the bounds and retry.",
        .axis.label()
    )]
    NoSignal { axis: Axis },

    /// Fewer usable points than the fit needs.
    #[error(
        "Only {usable} usable row(s) after filtering; at least {required} are needed. Relax the bounds and retry."
    )]
    InsufficientData { usable: usize, required: usize },

    /// The fit hit a state the frame checks should have ruled out.
    #[error("Internal consistency error during fit: {0}")]
    DegenerateFit(String),

    /// A request parameter is out of range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AnalysisError {
    /// True when the error indicates a bug rather than a data-shape problem.
    pub fn is_defect(&self) -> bool {
        matches!(self, AnalysisError::DegenerateFit(_))
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AnalysisError::InvalidRequest(_) => 2,
            AnalysisError::NoSignal { .. } | AnalysisError::InsufficientData { .. } => 3,
            AnalysisError::DegenerateFit(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
