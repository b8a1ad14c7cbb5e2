//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - the per-process data-access context (`warehouse`)
//! - outlier CSV and fit JSON exports (`export`)

pub mod export;
pub mod ingest;
pub mod warehouse;

pub use export::*;
pub use ingest::*;
pub use warehouse::*;
