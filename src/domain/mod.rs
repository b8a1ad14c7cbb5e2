//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - request parameters (`Granularity`, `OrderFreight`, `AnalysisBounds`, `AnalysisRequest`)
//! - raw warehouse rows (`FreightLine`)
//! - the regression frame (`AnalysisRow`, `ExclusionCounts`)

pub mod types;

pub use types::*;
