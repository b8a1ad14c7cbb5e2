//! Builds the regression frame from warehouse lines.
//!
//! Responsibilities:
//!
//! - compute freight % at the requested granularity
//! - apply the request's bounds and count what was dropped (and why)
//! - refuse frames with no variation on either axis
//!
//! Rows come out sorted by `entity_id`, so everything downstream is
//! reproducible regardless of input order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{
    AnalysisBounds, AnalysisRequest, AnalysisRow, ExclusionCounts, FreightLine, Granularity, OrderFreight, RowDims,
};
use crate::error::{AnalysisError, Axis};
use crate::math::{has_variation, median};

/// The filtered rows plus bookkeeping about the rows that did not make it.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    pub granularity: Granularity,
    pub rows: Vec<AnalysisRow>,
    /// Units (lines or orders) considered before filtering.
    pub considered: usize,
    pub excluded: ExclusionCounts,
}

impl AnalysisFrame {
    pub fn distances(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.distance_km).collect()
    }

    pub fn freight_pcts(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.freight_pct).collect()
    }
}

/// Build the frame for `request`.
///
/// `distances` is aligned with `lines` (see `geo::resolve_distances`).
pub fn build_frame(
    lines: &[FreightLine],
    distances: &[Option<f64>],
    request: &AnalysisRequest,
) -> Result<AnalysisFrame, AnalysisError> {
    if lines.len() != distances.len() {
        return Err(AnalysisError::DegenerateFit(format!(
            "{} lines but {} distances",
            lines.len(),
            distances.len()
        )));
    }

    let (mut rows, considered, excluded) = match request.granularity {
        Granularity::Line => line_rows(lines, distances, &request.bounds),
        Granularity::Order => order_rows(lines, distances, &request.bounds, request.order_freight),
    };
    rows.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

    debug!(
        granularity = ?request.granularity,
        considered,
        kept = rows.len(),
        excluded = excluded.total(),
        "analysis frame built"
    );

    let frame = AnalysisFrame {
        granularity: request.granularity,
        rows,
        considered,
        excluded,
    };
    check_signal(&frame)?;
    Ok(frame)
}

/// Reject empty frames and frames without variation on either axis.
fn check_signal(frame: &AnalysisFrame) -> Result<(), AnalysisError> {
    if frame.rows.is_empty() {
        return Err(AnalysisError::InsufficientData {
            usable: 0,
            required: crate::fit::MIN_FIT_POINTS,
        });
    }
    if !has_variation(&frame.distances()) {
        return Err(AnalysisError::NoSignal { axis: Axis::Distance });
    }
    if !has_variation(&frame.freight_pcts()) {
        return Err(AnalysisError::NoSignal { axis: Axis::FreightPct });
    }
    Ok(())
}

fn line_entity_id(line: &FreightLine) -> String {
    match &line.order_item_id {
        Some(item) => format!("{}:{item}", line.order_id),
        None => line.order_id.clone(),
    }
}

fn line_rows(
    lines: &[FreightLine],
    distances: &[Option<f64>],
    bounds: &AnalysisBounds,
) -> (Vec<AnalysisRow>, usize, ExclusionCounts) {
    let mut excluded = ExclusionCounts::default();
    let mut rows = Vec::with_capacity(lines.len());

    for (line, distance) in lines.iter().zip(distances) {
        let Some(distance_km) = *distance else {
            excluded.missing_coordinates += 1;
            continue;
        };
        let Some(freight_pct) = freight_ratio(line.freight_value, line.line_gross, bounds.min_line_gross) else {
            excluded.missing_merchandise += 1;
            continue;
        };
        if !(0.0..=bounds.max_distance_km).contains(&distance_km) {
            excluded.distance_out_of_range += 1;
            continue;
        }
        if !(0.0..=bounds.max_freight_pct).contains(&freight_pct) {
            excluded.freight_out_of_range += 1;
            continue;
        }

        rows.push(AnalysisRow {
            entity_id: line_entity_id(line),
            distance_km,
            freight_pct,
            dims: RowDims {
                order_id: line.order_id.clone(),
                order_item_id: line.order_item_id.clone(),
                seller_id: line.seller_id.clone(),
                product_id: line.product_id.clone(),
                order_date: line.order_date,
                line_gross: Some(line.line_gross),
            },
        });
    }

    (rows, lines.len(), excluded)
}

/// `freight / gross`, or `None` when the merchandise value is not above `min_gross`.
fn freight_ratio(freight: f64, gross: f64, min_gross: f64) -> Option<f64> {
    if !(gross.is_finite() && freight.is_finite()) || gross <= min_gross || gross <= 0.0 || freight < 0.0 {
        return None;
    }
    Some(freight / gross)
}

/// Why an order was left out of the frame.
enum OrderExclusion {
    MissingCoordinates,
    MissingMerchandise,
    DistanceOutOfRange,
    FreightOutOfRange,
}

impl ExclusionCounts {
    fn record(&mut self, reason: OrderExclusion) {
        match reason {
            OrderExclusion::MissingCoordinates => self.missing_coordinates += 1,
            OrderExclusion::MissingMerchandise => self.missing_merchandise += 1,
            OrderExclusion::DistanceOutOfRange => self.distance_out_of_range += 1,
            OrderExclusion::FreightOutOfRange => self.freight_out_of_range += 1,
        }
    }
}

/// Lane distance and freight % of one order, plus the legs it left out.
struct OrderLane {
    distance_km: f64,
    freight_pct: f64,
    legs_missing_coordinates: usize,
    legs_filtered: usize,
}

fn order_rows(
    lines: &[FreightLine],
    distances: &[Option<f64>],
    bounds: &AnalysisBounds,
    mode: OrderFreight,
) -> (Vec<AnalysisRow>, usize, ExclusionCounts) {
    let mut orders: BTreeMap<&str, Vec<(&FreightLine, Option<f64>)>> = BTreeMap::new();
    for (line, distance) in lines.iter().zip(distances) {
        orders.entry(line.order_id.as_str()).or_default().push((line, *distance));
    }

    let mut excluded = ExclusionCounts::default();
    let mut rows = Vec::with_capacity(orders.len());

    for (order_id, members) in &orders {
        let lane = match order_lane(members, bounds, mode) {
            Ok(lane) => lane,
            Err(reason) => {
                excluded.record(reason);
                continue;
            }
        };
        excluded.legs_missing_coordinates += lane.legs_missing_coordinates;
        excluded.legs_filtered += lane.legs_filtered;

        let first = members[0].0;
        rows.push(AnalysisRow {
            entity_id: order_id.to_string(),
            distance_km: lane.distance_km,
            freight_pct: lane.freight_pct,
            dims: RowDims {
                order_id: order_id.to_string(),
                order_item_id: None,
                seller_id: unique(members.iter().map(|(l, _)| l.seller_id.as_deref())),
                product_id: unique(members.iter().map(|(l, _)| l.product_id.as_deref())),
                order_date: first.order_date,
                line_gross: Some(members.iter().map(|(l, _)| l.line_gross).sum()),
            },
        });
    }

    (rows, orders.len(), excluded)
}

/// Roll one order's legs up into a lane.
///
/// The order distance is the median of its in-range leg distances. In
/// `Ratio` mode freight % is total freight over total merchandise of the
/// whole order. In `LegacyMax` mode each leg must also pass the merchandise
/// and freight % bounds, and both the median and the max run over the legs
/// that survive.
fn order_lane(
    members: &[(&FreightLine, Option<f64>)],
    bounds: &AnalysisBounds,
    mode: OrderFreight,
) -> Result<OrderLane, OrderExclusion> {
    let freight_in_range = |pct: &f64| (0.0..=bounds.max_freight_pct).contains(pct);

    let mut legs_missing_coordinates = 0;
    let mut legs_filtered = 0;
    let mut legs: Vec<(f64, Option<f64>)> = Vec::with_capacity(members.len());
    for (line, distance) in members {
        let Some(d) = *distance else {
            legs_missing_coordinates += 1;
            continue;
        };
        if !(0.0..=bounds.max_distance_km).contains(&d) {
            legs_filtered += 1;
            continue;
        }
        legs.push((d, freight_ratio(line.freight_value, line.line_gross, bounds.min_line_gross)));
    }
    if legs_missing_coordinates == members.len() {
        return Err(OrderExclusion::MissingCoordinates);
    }
    if legs.is_empty() {
        return Err(OrderExclusion::DistanceOutOfRange);
    }

    let (leg_distances, freight_pct) = match mode {
        OrderFreight::Ratio => {
            let gross: f64 = members.iter().map(|(l, _)| l.line_gross).sum();
            let freight: f64 = members.iter().map(|(l, _)| l.freight_value).sum();
            let pct = freight_ratio(freight, gross, bounds.min_line_gross).ok_or(OrderExclusion::MissingMerchandise)?;
            let leg_distances: Vec<f64> = legs.iter().map(|(d, _)| *d).collect();
            (leg_distances, pct)
        }
        OrderFreight::LegacyMax => {
            if legs.iter().all(|(_, pct)| pct.is_none()) {
                return Err(OrderExclusion::MissingMerchandise);
            }
            let kept: Vec<(f64, f64)> = legs
                .iter()
                .filter_map(|&(d, pct)| pct.filter(freight_in_range).map(|p| (d, p)))
                .collect();
            legs_filtered += legs.len() - kept.len();
            let pct = kept
                .iter()
                .map(|(_, p)| *p)
                .max_by(f64::total_cmp)
                .ok_or(OrderExclusion::FreightOutOfRange)?;
            (kept.iter().map(|(d, _)| *d).collect(), pct)
        }
    };
    if !freight_in_range(&freight_pct) {
        return Err(OrderExclusion::FreightOutOfRange);
    }
    let distance_km = median(&leg_distances).ok_or(OrderExclusion::DistanceOutOfRange)?;

    Ok(OrderLane {
        distance_km,
        freight_pct,
        legs_missing_coordinates,
        legs_filtered,
    })
}

/// The single shared value, or `None` when absent or mixed.
fn unique<'a>(mut values: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let first = values.next()??;
    for v in values {
        if v != Some(first) {
            return None;
        }
    }
    Some(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(order: &str, item: &str, gross: f64, freight: f64, seller: &str) -> FreightLine {
        FreightLine {
            order_id: order.to_string(),
            order_item_id: Some(item.to_string()),
            seller_id: Some(seller.to_string()),
            product_id: Some(format!("p-{order}-{item}")),
            line_gross: gross,
            freight_value: freight,
            ..FreightLine::default()
        }
    }

    fn request(granularity: Granularity) -> AnalysisRequest {
        AnalysisRequest {
            granularity,
            ..AnalysisRequest::default()
        }
    }

    #[test]
    fn line_frame_filters_and_counts() {
        let lines = vec![
            line("o3", "1", 100.0, 10.0, "s1"),
            line("o1", "1", 100.0, 20.0, "s1"),
            line("o2", "1", 0.0, 5.0, "s1"),    // no merchandise
            line("o4", "1", 100.0, 5.0, "s2"),  // no coordinates
            line("o5", "1", 100.0, 5.0, "s2"),  // too far
            line("o6", "1", 10.0, 50.0, "s2"),  // freight 500%
            line("o7", "1", 100.0, 30.0, "s2"),
        ];
        let distances = vec![Some(300.0), Some(100.0), Some(50.0), None, Some(5000.0), Some(10.0), Some(200.0)];

        let frame = build_frame(&lines, &distances, &request(Granularity::Line)).unwrap();
        let ids: Vec<&str> = frame.rows.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["o1:1", "o3:1", "o7:1"]);
        assert!((frame.rows[0].freight_pct - 0.2).abs() < 1e-12);
        assert_eq!(frame.considered, 7);
        assert_eq!(
            frame.excluded,
            ExclusionCounts {
                missing_coordinates: 1,
                missing_merchandise: 1,
                distance_out_of_range: 1,
                freight_out_of_range: 1,
                ..ExclusionCounts::default()
            }
        );
    }

    #[test]
    fn order_frame_uses_median_distance_and_total_ratio() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("a", "2", 300.0, 10.0, "s1"),
            line("a", "3", 100.0, 20.0, "s1"),
            line("b", "1", 100.0, 30.0, "s2"),
            line("c", "1", 200.0, 10.0, "s3"),
        ];
        let distances = vec![Some(100.0), Some(900.0), Some(110.0), Some(400.0), None];

        let frame = build_frame(&lines, &distances, &request(Granularity::Order)).unwrap();
        assert_eq!(frame.considered, 3);
        assert_eq!(frame.excluded.missing_coordinates, 1);
        assert_eq!(frame.rows.len(), 2);

        let a = &frame.rows[0];
        assert_eq!(a.entity_id, "a");
        assert_eq!(a.distance_km, 110.0);
        assert!((a.freight_pct - 40.0 / 500.0).abs() < 1e-12);
        assert_eq!(a.dims.seller_id.as_deref(), Some("s1"));
        assert_eq!(a.dims.product_id, None);
        assert_eq!(a.dims.line_gross, Some(500.0));
    }

    #[test]
    fn order_frame_legacy_max_takes_largest_line_pct() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("a", "2", 100.0, 30.0, "s1"),
            line("b", "1", 100.0, 5.0, "s1"),
        ];
        let distances = vec![Some(100.0), Some(200.0), Some(300.0)];
        let mut req = request(Granularity::Order);
        req.order_freight = OrderFreight::LegacyMax;

        let frame = build_frame(&lines, &distances, &req).unwrap();
        assert!((frame.rows[0].freight_pct - 0.3).abs() < 1e-12);
        assert_eq!(frame.rows[0].distance_km, 150.0);
    }

    #[test]
    fn legacy_max_ignores_legs_dropped_by_bounds() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("a", "2", 100.0, 80.0, "s1"), // too far
            line("a", "3", 100.0, 90.0, "s1"), // no coordinates
            line("a", "4", 100.0, 150.0, "s1"), // freight 150%
            line("b", "1", 100.0, 30.0, "s1"),
        ];
        let distances = vec![Some(100.0), Some(9000.0), None, Some(300.0), Some(400.0)];
        let mut req = request(Granularity::Order);
        req.order_freight = OrderFreight::LegacyMax;

        let frame = build_frame(&lines, &distances, &req).unwrap();
        let a = &frame.rows[0];
        assert_eq!(a.entity_id, "a");
        assert!((a.freight_pct - 0.10).abs() < 1e-12);
        assert_eq!(a.distance_km, 100.0);
        assert_eq!(frame.excluded.total(), 0);
        assert_eq!(frame.excluded.legs_missing_coordinates, 1);
        assert_eq!(frame.excluded.legs_filtered, 2);
    }

    #[test]
    fn order_frame_counts_dropped_legs_of_kept_orders() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("a", "2", 100.0, 10.0, "s1"),
            line("b", "1", 100.0, 30.0, "s1"),
            line("c", "1", 100.0, 30.0, "s1"),
        ];
        let distances = vec![Some(100.0), None, Some(400.0), None];

        let frame = build_frame(&lines, &distances, &request(Granularity::Order)).unwrap();
        assert_eq!(frame.rows.len(), 2);
        // Order `c` is excluded whole; only `a`'s unlocated leg is a leg drop.
        assert_eq!(frame.excluded.missing_coordinates, 1);
        assert_eq!(frame.excluded.legs_missing_coordinates, 1);
        assert_eq!(frame.excluded.legs_filtered, 0);
    }

    #[test]
    fn order_legs_outside_distance_bound_do_not_count() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("a", "2", 100.0, 10.0, "s1"),
            line("b", "1", 100.0, 20.0, "s1"),
        ];
        let distances = vec![Some(100.0), Some(9000.0), Some(5000.0)];
        let mut req = request(Granularity::Order);
        req.bounds.max_distance_km = 1000.0;

        let result = build_frame(&lines, &distances, &req);
        // Only order `a` survives, which leaves no variation.
        assert!(matches!(result, Err(AnalysisError::NoSignal { .. })));
    }

    #[test]
    fn constant_distance_is_no_signal() {
        let lines = vec![
            line("a", "1", 100.0, 10.0, "s1"),
            line("b", "1", 100.0, 20.0, "s1"),
            line("c", "1", 100.0, 30.0, "s1"),
        ];
        let distances = vec![Some(5.0), Some(5.0), Some(5.0)];
        let err = build_frame(&lines, &distances, &request(Granularity::Line)).unwrap_err();
        assert_eq!(err, AnalysisError::NoSignal { axis: Axis::Distance });
    }

    #[test]
    fn constant_freight_is_no_signal() {
        let lines = vec![line("a", "1", 100.0, 10.0, "s1"), line("b", "1", 100.0, 10.0, "s1")];
        let distances = vec![Some(5.0), Some(50.0)];
        let err = build_frame(&lines, &distances, &request(Granularity::Line)).unwrap_err();
        assert_eq!(err, AnalysisError::NoSignal { axis: Axis::FreightPct });
    }

    #[test]
    fn empty_after_filters_is_insufficient() {
        let lines = vec![line("a", "1", 100.0, 10.0, "s1")];
        let err = build_frame(&lines, &[None], &request(Granularity::Line)).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { usable: 0, .. }));
    }
}
