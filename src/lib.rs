//! `freight-lanes` library crate.
//!
//! Screens freight cost against shipping distance: derive lane distances from
//! postal-code centroids, fit freight % ~ distance by OLS, standardize the
//! residuals and rank the lanes that cost far more (or less) than the trend.
//!
//! The binary (`lanes`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the analysis core can be embedded behind other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod frame;
pub mod geo;
pub mod io;
pub mod math;
pub mod report;
