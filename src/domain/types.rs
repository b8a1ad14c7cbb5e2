//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during analysis
//! - exported to JSON/CSV
//! - validated once at the request boundary

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within `[-90, 90] x [-180, 180]`.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Unit of analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One row per shipped line item.
    Line,
    /// One row per order.
    Order,
}

impl Granularity {
    pub fn display_name(self) -> &'static str {
        match self {
            Granularity::Line => "line items",
            Granularity::Order => "orders",
        }
    }
}

/// How order-level freight % is rolled up from its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrderFreight {
    /// Total freight / total merchandise value of the order.
    Ratio,
    /// Largest per-line freight % in the order (legacy dashboard figure).
    LegacyMax,
}

/// One shipped line as exported by the warehouse.
///
/// `distance_km` is the precomputed lane distance if the export carries one;
/// otherwise the postal prefixes are used to derive it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreightLine {
    pub order_id: String,
    pub order_item_id: Option<String>,
    pub seller_id: Option<String>,
    pub product_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    /// Merchandise value of the line.
    pub line_gross: f64,
    pub freight_value: f64,
    pub distance_km: Option<f64>,
    pub seller_zip: Option<String>,
    pub customer_zip: Option<String>,
}

/// Passthrough attributes carried for reporting; never used by the fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowDims {
    pub order_id: String,
    pub order_item_id: Option<String>,
    pub seller_id: Option<String>,
    pub product_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub line_gross: Option<f64>,
}

/// A row of the regression frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub entity_id: String,
    pub distance_km: f64,
    pub freight_pct: f64,
    pub dims: RowDims,
}

/// Filter bounds applied before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBounds {
    pub max_distance_km: f64,
    pub max_freight_pct: f64,
    /// Rows need merchandise value strictly above this.
    pub min_line_gross: f64,
}

impl Default for AnalysisBounds {
    fn default() -> Self {
        Self {
            max_distance_km: 1500.0,
            max_freight_pct: 1.0,
            min_line_gross: 0.0,
        }
    }
}

/// A fully specified analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub granularity: Granularity,
    pub order_freight: OrderFreight,
    pub bounds: AnalysisBounds,
    pub z_threshold: f64,
    pub top_n: usize,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            granularity: Granularity::Line,
            order_freight: OrderFreight::Ratio,
            bounds: AnalysisBounds::default(),
            z_threshold: 2.5,
            top_n: 50,
        }
    }
}

impl AnalysisRequest {
    /// Reject out-of-range parameters before any data is touched.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let b = &self.bounds;
        if !(b.max_distance_km.is_finite() && b.max_distance_km > 0.0) {
            return Err(AnalysisError::InvalidRequest(format!(
                "max distance must be > 0 km (got {})",
                b.max_distance_km
            )));
        }
        if !(b.max_freight_pct.is_finite() && b.max_freight_pct > 0.0) {
            return Err(AnalysisError::InvalidRequest(format!(
                "max freight % must be > 0 (got {})",
                b.max_freight_pct
            )));
        }
        if !(b.min_line_gross.is_finite() && b.min_line_gross >= 0.0) {
            return Err(AnalysisError::InvalidRequest(format!(
                "min merchandise value must be >= 0 (got {})",
                b.min_line_gross
            )));
        }
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(AnalysisError::InvalidRequest(format!(
                "outlier threshold must be > 0 (got {})",
                self.z_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(AnalysisError::InvalidRequest("top-N must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Rows dropped while building the frame, by reason.
///
/// The `legs_*` counters only apply at order level: they count lines left out
/// of orders that still made it into the frame, and are not part of `total()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionCounts {
    pub missing_coordinates: usize,
    pub missing_merchandise: usize,
    pub distance_out_of_range: usize,
    pub freight_out_of_range: usize,
    pub legs_missing_coordinates: usize,
    /// Legs with coordinates that failed the distance, merchandise or freight bounds.
    pub legs_filtered: usize,
}

impl ExclusionCounts {
    /// Units (lines or orders) excluded.
    pub fn total(&self) -> usize {
        self.missing_coordinates
            + self.missing_merchandise
            + self.distance_out_of_range
            + self.freight_out_of_range
    }
}
