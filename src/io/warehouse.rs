//! The data-access context.
//!
//! A `Warehouse` is opened once (at process start), handed by reference to
//! every analysis request and dropped at exit. The analysis core never sees
//! file paths or readers, only the materialized rows.
//!
//! The freight line export is required. The geo reference is an optional
//! capability: without it, only lines that already carry `distance_km` can be
//! analysed. A configured-but-unreadable geo file is still an error.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::FreightLine;
use crate::error::AppError;
use crate::geo::CentroidTable;
use crate::io::ingest::{load_freight_lines, load_geo_reference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub lines_csv: PathBuf,
    pub geo_csv: Option<PathBuf>,
}

/// Ingest bookkeeping surfaced in reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub line_rows_read: usize,
    pub line_rows_rejected: usize,
    pub geo_rows_read: usize,
    pub geo_rows_rejected: usize,
}

#[derive(Debug, Clone)]
pub struct Warehouse {
    lines: Vec<FreightLine>,
    centroids: Option<CentroidTable>,
    stats: LoadStats,
}

impl Warehouse {
    pub fn open(config: &WarehouseConfig) -> Result<Self, AppError> {
        let ingest = load_freight_lines(&config.lines_csv)?;
        let mut stats = LoadStats {
            line_rows_read: ingest.rows_read,
            line_rows_rejected: ingest.row_errors.len(),
            ..LoadStats::default()
        };
        for e in ingest.row_errors.iter().take(5) {
            warn!(line = e.line, "skipped freight line: {}", e.message);
        }
        for w in ingest.row_warnings.iter().take(5) {
            warn!(line = w.line, "kept freight line without order date: {}", w.message);
        }
        info!(
            path = %config.lines_csv.display(),
            rows = ingest.rows_read,
            kept = ingest.lines.len(),
            rejected = stats.line_rows_rejected,
            "loaded freight lines"
        );

        let centroids = match &config.geo_csv {
            Some(path) => {
                let geo = load_geo_reference(path)?;
                stats.geo_rows_read = geo.rows_read;
                stats.geo_rows_rejected = geo.row_errors.len() + geo.table.skipped();
                info!(
                    path = %path.display(),
                    prefixes = geo.table.len(),
                    rejected = stats.geo_rows_rejected,
                    "loaded geo reference"
                );
                Some(geo.table)
            }
            None => {
                info!("no geo reference configured; using precomputed distance_km only");
                None
            }
        };

        Ok(Self {
            lines: ingest.lines,
            centroids,
            stats,
        })
    }

    /// Build a warehouse from rows already in memory.
    pub fn from_parts(lines: Vec<FreightLine>, centroids: Option<CentroidTable>) -> Self {
        let stats = LoadStats {
            line_rows_read: lines.len(),
            ..LoadStats::default()
        };
        Self {
            lines,
            centroids,
            stats,
        }
    }

    pub fn lines(&self) -> &[FreightLine] {
        &self.lines
    }

    pub fn centroids(&self) -> Option<&CentroidTable> {
        self.centroids.as_ref()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }
}
