//! Great-circle distance on a spherical Earth.
//!
//! ```text
//! d = 2R * asin( sqrt( sin²(Δlat/2) + cos(lat1) cos(lat2) sin²(Δlon/2) ) )
//! ```

use crate::domain::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Half the circumference: the largest possible great-circle distance.
pub const ANTIPODAL_KM: f64 = std::f64::consts::PI * EARTH_RADIUS_KM;

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `h` a hair past 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// True if `d` could be a great-circle distance.
pub fn is_plausible_distance(d: f64) -> bool {
    d.is_finite() && (0.0..=ANTIPODAL_KM + 1e-6).contains(&d)
}
