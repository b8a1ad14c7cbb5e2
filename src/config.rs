//! Environment-backed defaults.
//!
//! `.env` is loaded first (if present); CLI flags always win over the
//! environment.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::AppError;
use crate::io::WarehouseConfig;

pub const LINES_ENV: &str = "LANES_LINES_CSV";
pub const GEO_ENV: &str = "LANES_GEO_CSV";

/// Load `.env` into the process environment. A missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!("ignoring unreadable .env: {e}"),
    }
}

/// Resolve warehouse paths from CLI flags, then the environment.
pub fn warehouse_config(lines: Option<PathBuf>, geo: Option<PathBuf>) -> Result<WarehouseConfig, AppError> {
    resolve_warehouse_config(lines, geo, env_path(LINES_ENV), env_path(GEO_ENV))
}

/// Geo reference path from the CLI flag, then the environment.
pub fn geo_path(geo: Option<PathBuf>) -> Option<PathBuf> {
    geo.or_else(|| env_path(GEO_ENV))
}

fn resolve_warehouse_config(
    lines_arg: Option<PathBuf>,
    geo_arg: Option<PathBuf>,
    lines_env: Option<PathBuf>,
    geo_env: Option<PathBuf>,
) -> Result<WarehouseConfig, AppError> {
    let lines_csv = lines_arg.or(lines_env).ok_or_else(|| {
        AppError::new(2, format!("No freight lines export given. Pass --lines <CSV> or set {LINES_ENV}."))
    })?;
    Ok(WarehouseConfig {
        lines_csv,
        geo_csv: geo_arg.or(geo_env),
    })
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let cfg = resolve_warehouse_config(
            Some(PathBuf::from("cli.csv")),
            None,
            Some(PathBuf::from("env.csv")),
            Some(PathBuf::from("geo_env.csv")),
        )
        .unwrap();
        assert_eq!(cfg.lines_csv, PathBuf::from("cli.csv"));
        assert_eq!(cfg.geo_csv, Some(PathBuf::from("geo_env.csv")));
    }

    #[test]
    fn lines_are_required() {
        let err = resolve_warehouse_config(None, Some(PathBuf::from("geo.csv")), None, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains(LINES_ENV));
    }
}
