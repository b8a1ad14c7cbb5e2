//! Postal prefix -> coordinate reference table.
//!
//! Geo reference exports usually hold many rows per prefix (one per sampled
//! address). We collapse them to the arithmetic mean of all valid rows, summed
//! in input order so the same file always yields the same centroid.

use std::collections::HashMap;

use crate::domain::GeoPoint;

/// Width numeric prefixes are padded to before comparison.
const PREFIX_WIDTH: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct CentroidTable {
    by_prefix: HashMap<String, GeoPoint>,
    /// Reference rows dropped for invalid coordinates.
    skipped: usize,
}

impl CentroidTable {
    /// Build a table from `(prefix, point)` rows, in order.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, GeoPoint)>,
    {
        let mut sums: HashMap<String, (f64, f64, usize)> = HashMap::new();
        let mut skipped = 0usize;

        for (prefix, point) in rows {
            if !point.is_valid() {
                skipped += 1;
                continue;
            }
            let Some(key) = normalize_prefix(&prefix) else {
                skipped += 1;
                continue;
            };
            let entry = sums.entry(key).or_insert((0.0, 0.0, 0));
            entry.0 += point.lat;
            entry.1 += point.lng;
            entry.2 += 1;
        }

        let by_prefix = sums
            .into_iter()
            .map(|(k, (lat, lng, n))| (k, GeoPoint::new(lat / n as f64, lng / n as f64)))
            .collect();

        Self { by_prefix, skipped }
    }

    pub fn lookup(&self, prefix: &str) -> Option<GeoPoint> {
        let key = normalize_prefix(prefix)?;
        self.by_prefix.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Trim and left-pad all-digit prefixes (spreadsheets drop leading zeros).
pub fn normalize_prefix(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) && s.len() < PREFIX_WIDTH {
        return Some(format!("{s:0>width$}", width = PREFIX_WIDTH));
    }
    Some(s.to_string())
}
