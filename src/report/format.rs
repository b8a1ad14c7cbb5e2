//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::io::LoadStats;
use crate::report::OutlierRow;

/// KPI header, exclusions, model line and auto-insights.
pub fn format_run_summary(run: &RunOutput, stats: &LoadStats) -> String {
    let mut out = String::new();
    let req = &run.request;
    let fit = &run.fit;
    let ex = &run.frame.excluded;

    out.push_str("=== lanes - Freight % vs Distance ===\n");
    out.push_str(&format!(
        "Level: {} | distance <= {:.0} km | freight % <= {:.2} | merchandise > {:.2}\n",
        run.frame.granularity.display_name(),
        req.bounds.max_distance_km,
        req.bounds.max_freight_pct,
        req.bounds.min_line_gross,
    ));
    if stats.line_rows_rejected > 0 {
        out.push_str(&format!(
            "Input: {} line rows read, {} rejected as malformed\n",
            fmt_count(stats.line_rows_read),
            fmt_count(stats.line_rows_rejected),
        ));
    }
    if stats.geo_rows_read > 0 {
        out.push_str(&format!(
            "Geo reference: {} rows read, {} rejected\n",
            fmt_count(stats.geo_rows_read),
            fmt_count(stats.geo_rows_rejected),
        ));
    }
    out.push_str(&format!(
        "Rows: considered={} analysed={} excluded={}\n",
        fmt_count(run.frame.considered),
        fmt_count(fit.n()),
        fmt_count(ex.total()),
    ));
    if ex.missing_coordinates > 0 {
        out.push_str(&format!(
            "  {} {} excluded — missing coordinates\n",
            fmt_count(ex.missing_coordinates),
            run.frame.granularity.display_name(),
        ));
    }
    for (count, label) in [
        (ex.missing_merchandise, "no merchandise value"),
        (ex.distance_out_of_range, "distance out of range"),
        (ex.freight_out_of_range, "freight % out of range"),
    ] {
        if count > 0 {
            out.push_str(&format!("  {} excluded — {label}\n", fmt_count(count)));
        }
    }
    for (count, label) in [
        (ex.legs_missing_coordinates, "missing coordinates"),
        (ex.legs_filtered, "outside the bounds"),
    ] {
        if count > 0 {
            out.push_str(&format!(
                "  {} line legs left out of included orders — {label}\n",
                fmt_count(count)
            ));
        }
    }

    out.push('\n');
    out.push_str(&format!("{:<28} {}\n", "Rows analysed", fmt_count(fit.n())));
    out.push_str(&format!("{:<28} {:.3}\n", "R² (fit quality)", fit.r_squared()));
    out.push_str(&format!("{:<28} {:.4}\n", "Slope (Δ p.p. per km)", fit.slope_pp_per_km()));
    out.push_str(&format!(
        "{:<28} {} (|z| > {})\n",
        "Outliers flagged",
        fmt_count(run.n_outliers),
        req.z_threshold
    ));

    out.push_str(&format!(
        "\nModel: freight_pct = {:.6} + {:.8} * distance_km (residual sigma {:.4})\n",
        fit.intercept(),
        fit.slope(),
        fit.residual_sigma(),
    ));

    out.push_str("\nAuto-insights:\n");
    for line in run.insights.lines() {
        out.push_str(&format!("• {line}\n"));
    }

    out
}

/// The ranked outlier table, or a note when it is empty.
pub fn format_outlier_table(rows: &[OutlierRow]) -> String {
    if rows.is_empty() {
        return "No outliers at the current threshold.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<40} {:>10} {:>10} {:>10} {:>10} {:>7} {:<16}",
            "entity", "dist_km", "freight%", "fitted%", "resid", "z", "seller"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<40} {:-<10} {:-<10} {:-<10} {:-<10} {:-<7} {:-<16}",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<40} {:>10.1} {:>10.2} {:>10.2} {:>10.4} {:>7.2} {:<16}",
                truncate(&r.entity_id, 40),
                r.distance_km,
                r.freight_pct * 100.0,
                r.fitted * 100.0,
                r.residual,
                r.z_score,
                truncate(r.seller_id.as_deref().unwrap_or(""), 16),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// `1234567` -> `1,234,567`.
fn fmt_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::analyze_frame;
    use crate::domain::{AnalysisRequest, AnalysisRow, ExclusionCounts, Granularity, RowDims};
    use crate::frame::AnalysisFrame;

    #[test]
    fn counts_get_thousands_separators() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1000), "1,000");
        assert_eq!(fmt_count(1234567), "1,234,567");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd.");
    }

    #[test]
    fn empty_table_message() {
        assert_eq!(format_outlier_table(&[]), "No outliers at the current threshold.\n");
    }

    #[test]
    fn summary_mentions_kpis_and_exclusions() {
        let rows: Vec<AnalysisRow> = [(100.0, 0.05), (200.0, 0.08), (300.0, 0.11), (400.0, 0.50)]
            .iter()
            .enumerate()
            .map(|(i, (x, y))| AnalysisRow {
                entity_id: format!("o{i}"),
                distance_km: *x,
                freight_pct: *y,
                dims: RowDims {
                    order_id: format!("o{i}"),
                    ..RowDims::default()
                },
            })
            .collect();
        let frame = AnalysisFrame {
            granularity: Granularity::Line,
            rows,
            considered: 1500,
            excluded: ExclusionCounts {
                missing_coordinates: 1496,
                ..ExclusionCounts::default()
            },
        };
        let run = analyze_frame(frame, &AnalysisRequest::default()).unwrap();
        let text = format_run_summary(&run, &LoadStats::default());

        assert!(text.contains("considered=1,500"));
        assert!(text.contains("1,496 line items excluded — missing coordinates"));
        assert!(text.contains("R² (fit quality)"));
        assert!(text.contains("Outliers flagged             0"));
        assert!(text.contains("increases with distance"));
        assert_eq!(format_outlier_table(&run.ranked), "No outliers at the current threshold.\n");
        assert!(!text.contains("Geo reference"));
    }

    #[test]
    fn summary_reports_geo_ingest_and_dropped_legs() {
        let rows: Vec<AnalysisRow> = [(100.0, 0.05), (200.0, 0.09), (300.0, 0.11)]
            .iter()
            .enumerate()
            .map(|(i, (x, y))| AnalysisRow {
                entity_id: format!("o{i}"),
                distance_km: *x,
                freight_pct: *y,
                dims: RowDims::default(),
            })
            .collect();
        let frame = AnalysisFrame {
            granularity: Granularity::Order,
            rows,
            considered: 3,
            excluded: ExclusionCounts {
                legs_missing_coordinates: 4,
                legs_filtered: 2,
                ..ExclusionCounts::default()
            },
        };
        let run = analyze_frame(frame, &AnalysisRequest::default()).unwrap();
        let stats = LoadStats {
            line_rows_read: 10,
            geo_rows_read: 2500,
            geo_rows_rejected: 7,
            ..LoadStats::default()
        };
        let text = format_run_summary(&run, &stats);

        assert!(text.contains("Geo reference: 2,500 rows read, 7 rejected"));
        assert!(text.contains("excluded=0"));
        assert!(text.contains("4 line legs left out of included orders — missing coordinates"));
        assert!(text.contains("2 line legs left out of included orders — outside the bounds"));
    }
}
