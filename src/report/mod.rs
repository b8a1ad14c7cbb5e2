//! Reporting: outlier ranking, auto-insights and formatted terminal output.

pub mod format;
pub mod insights;

pub use format::*;
pub use insights::*;
