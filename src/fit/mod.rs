//! Freight-vs-distance model fitting.
//!
//! Responsibilities:
//!
//! - fit `freight_pct = a + b * distance_km` by ordinary least squares
//! - standardize residuals and flag outliers against a caller threshold

pub mod outliers;
pub mod regression;

pub use outliers::*;
pub use regression::*;

/// Fewest points a fit accepts (`n - 2` residual degrees of freedom must be positive).
pub const MIN_FIT_POINTS: usize = 3;
