//! CSV ingest for the warehouse exports.
//!
//! Two relations are read:
//!
//! - freight lines: one row per shipped order line
//! - geo reference: postal prefix -> latitude/longitude samples
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness, input order preserved)
//! - **Separation of concerns**: no filtering or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{FreightLine, GeoPoint};
use crate::error::AppError;
use crate::geo::CentroidTable;

const ORDER_ID: &[&str] = &["order_id"];
const ORDER_ITEM_ID: &[&str] = &["order_item_id"];
const SELLER_ID: &[&str] = &["seller_id"];
const PRODUCT_ID: &[&str] = &["product_id"];
const ORDER_DATE: &[&str] = &["order_date", "order_purchase_timestamp"];
const LINE_GROSS: &[&str] = &["line_gross", "price"];
const FREIGHT_VALUE: &[&str] = &["freight_value"];
const DISTANCE_KM: &[&str] = &["distance_km"];
const SELLER_ZIP: &[&str] = &["seller_zip_code_prefix", "seller_zip_prefix", "seller_zip"];
const CUSTOMER_ZIP: &[&str] = &["customer_zip_code_prefix", "customer_zip_prefix", "customer_zip"];

const GEO_PREFIX: &[&str] = &["geolocation_zip_code_prefix", "zip_code_prefix", "zip_prefix"];
const GEO_LAT: &[&str] = &["geolocation_lat", "lat", "latitude"];
const GEO_LNG: &[&str] = &["geolocation_lng", "lng", "lon", "longitude"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Freight line ingest output.
///
/// `row_warnings` are rows that were kept with a passthrough attribute blanked.
#[derive(Debug, Clone)]
pub struct LineIngest {
    pub lines: Vec<FreightLine>,
    pub row_errors: Vec<RowError>,
    pub row_warnings: Vec<RowError>,
    pub rows_read: usize,
}

/// Geo reference ingest output.
#[derive(Debug, Clone)]
pub struct GeoIngest {
    pub table: CentroidTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Column positions for the freight line relation.
struct LineColumns {
    order_id: usize,
    order_item_id: Option<usize>,
    seller_id: Option<usize>,
    product_id: Option<usize>,
    order_date: Option<usize>,
    line_gross: usize,
    /// Header as written in the file, for error messages.
    line_gross_name: String,
    freight_value: usize,
    distance_km: Option<usize>,
    seller_zip: Option<usize>,
    customer_zip: Option<usize>,
}

pub fn load_freight_lines(path: &Path) -> Result<LineIngest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open freight lines CSV '{}': {e}", path.display())))?;
    read_freight_lines(file)
}

pub fn read_freight_lines<R: Read>(input: R) -> Result<LineIngest, AppError> {
    let mut reader = csv_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read freight lines CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let line_gross = require_column(&header_map, LINE_GROSS)?;
    let cols = LineColumns {
        order_id: require_column(&header_map, ORDER_ID)?,
        order_item_id: find_column(&header_map, ORDER_ITEM_ID),
        seller_id: find_column(&header_map, SELLER_ID),
        product_id: find_column(&header_map, PRODUCT_ID),
        order_date: find_column(&header_map, ORDER_DATE),
        line_gross,
        line_gross_name: column_name(&headers, line_gross),
        freight_value: require_column(&header_map, FREIGHT_VALUE)?,
        distance_km: find_column(&header_map, DISTANCE_KM),
        seller_zip: find_column(&header_map, SELLER_ZIP),
        customer_zip: find_column(&header_map, CUSTOMER_ZIP),
    };
    let has_zips = cols.seller_zip.is_some() && cols.customer_zip.is_some();
    if cols.distance_km.is_none() && !has_zips {
        return Err(AppError::new(
            2,
            "Freight lines CSV needs either `distance_km` or both `seller_zip_code_prefix` and `customer_zip_code_prefix`.",
        ));
    }

    let mut lines = Vec::new();
    let mut row_errors = Vec::new();
    let mut row_warnings = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and records are 0-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_line(&record, &cols));
        match parsed {
            Ok((l, warning)) => {
                if let Some(message) = warning {
                    row_warnings.push(RowError { line, message });
                }
                lines.push(l);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok(LineIngest {
        lines,
        row_errors,
        row_warnings,
        rows_read,
    })
}

/// Parse one record. An unreadable `order_date` blanks the date and comes
/// back as a warning; the row is kept.
fn parse_line(record: &StringRecord, cols: &LineColumns) -> Result<(FreightLine, Option<String>), String> {
    let order_id = get_field(record, Some(cols.order_id))
        .ok_or("Missing required value: `order_id`")?
        .to_string();
    let line_gross = parse_required_f64(record, cols.line_gross, &cols.line_gross_name)?;
    let freight_value = parse_required_f64(record, cols.freight_value, "freight_value")?;

    let distance_km = match get_field(record, cols.distance_km) {
        Some(s) => Some(parse_f64(s).ok_or_else(|| format!("Invalid `distance_km` value '{s}'."))?),
        None => None,
    };
    let (order_date, warning) = match get_field(record, cols.order_date).map(parse_date) {
        Some(Ok(d)) => (Some(d), None),
        Some(Err(message)) => (None, Some(message)),
        None => (None, None),
    };

    let line = FreightLine {
        order_id,
        order_item_id: get_field(record, cols.order_item_id).map(str::to_string),
        seller_id: get_field(record, cols.seller_id).map(str::to_string),
        product_id: get_field(record, cols.product_id).map(str::to_string),
        order_date,
        line_gross,
        freight_value,
        distance_km,
        seller_zip: get_field(record, cols.seller_zip).map(str::to_string),
        customer_zip: get_field(record, cols.customer_zip).map(str::to_string),
    };
    Ok((line, warning))
}

pub fn load_geo_reference(path: &Path) -> Result<GeoIngest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open geo reference CSV '{}': {e}", path.display())))?;
    read_geo_reference(file)
}

pub fn read_geo_reference<R: Read>(input: R) -> Result<GeoIngest, AppError> {
    let mut reader = csv_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read geo reference CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let prefix_col = require_column(&header_map, GEO_PREFIX)?;
    let lat_col = require_column(&header_map, GEO_LAT)?;
    let lng_col = require_column(&header_map, GEO_LNG)?;
    let lat_name = column_name(&headers, lat_col);
    let lng_name = column_name(&headers, lng_col);

    let mut samples = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let parsed = result.map_err(|e| format!("CSV parse error: {e}")).and_then(|record| {
            let prefix = get_field(&record, Some(prefix_col)).ok_or("Missing postal prefix.")?;
            let lat = parse_required_f64(&record, lat_col, &lat_name)?;
            let lng = parse_required_f64(&record, lng_col, &lng_name)?;
            Ok((prefix.to_string(), GeoPoint::new(lat, lng)))
        });
        match parsed {
            Ok(sample) => samples.push(sample),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok(GeoIngest {
        table: CentroidTable::from_rows(samples),
        row_errors,
        rows_read,
    })
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|name| header_map.get(*name).copied())
}

fn require_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Result<usize, AppError> {
    find_column(header_map, aliases)
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{}`", aliases.join("` or `"))))
}

fn column_name(headers: &StringRecord, idx: usize) -> String {
    headers.get(idx).map(normalize_header_name).unwrap_or_default()
}

fn get_field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    record.get(idx?).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_required_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let s = get_field(record, Some(idx)).ok_or_else(|| format!("Missing required value: `{name}`"))?;
    parse_f64(s).ok_or_else(|| format!("Invalid `{name}` value '{s}'."))
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!("Invalid date '{s}'. Expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS."))
}
