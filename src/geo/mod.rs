//! Geospatial helpers: great-circle distance and postal-code centroids.
//!
//! - `haversine`: pure point-to-point distance
//! - `centroids`: postal prefix -> representative coordinate table
//!
//! `resolve_distances` combines both to give every freight line its lane
//! distance (or `None` when an endpoint is unknown).

pub mod centroids;
pub mod haversine;

pub use centroids::*;
pub use haversine::*;

use rayon::prelude::*;

use crate::domain::FreightLine;

/// Lane distance for every line, aligned by index.
///
/// A valid precomputed `distance_km` wins; otherwise both postal prefixes must
/// resolve in `centroids`. Lines are independent so this runs in parallel.
pub fn resolve_distances(lines: &[FreightLine], centroids: Option<&CentroidTable>) -> Vec<Option<f64>> {
    lines
        .par_iter()
        .map(|line| {
            if let Some(d) = line.distance_km.filter(|d| is_plausible_distance(*d)) {
                return Some(d);
            }
            let table = centroids?;
            let from = table.lookup(line.seller_zip.as_deref()?)?;
            let to = table.lookup(line.customer_zip.as_deref()?)?;
            Some(haversine_km(from, to))
        })
        .collect()
}
