//! Ranked outlier table and plain-language conclusions.
//!
//! Everything here is a deterministic view over an existing `FitResult`;
//! nothing is refit or re-estimated.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::AnalysisRow;
use crate::fit::FitResult;

/// One row of the outlier table (also the CSV export schema).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierRow {
    pub entity_id: String,
    pub order_id: String,
    pub order_item_id: Option<String>,
    pub seller_id: Option<String>,
    pub product_id: Option<String>,
    pub distance_km: f64,
    pub freight_pct: f64,
    pub fitted: f64,
    pub residual: f64,
    pub z_score: f64,
}

/// The row most worth a closer look.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestigationLead {
    pub entity_id: String,
    pub order_id: String,
    pub seller_id: Option<String>,
    pub product_id: Option<String>,
    pub z_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub variance_explained: String,
    pub slope_direction: String,
    pub lead: Option<InvestigationLead>,
}

impl Insights {
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.variance_explained.clone(), self.slope_direction.clone()];
        if let Some(lead) = &self.lead {
            out.push(format!(
                "Largest deviation: order `{}` (z≈{:.1}). Investigate seller `{}` / product `{}` or carrier zoning.",
                lead.order_id,
                lead.z_score,
                lead.seller_id.as_deref().unwrap_or("-"),
                lead.product_id.as_deref().unwrap_or("-"),
            ));
        }
        out
    }
}

/// Flagged rows ordered by `|z|` descending (ties by `entity_id`), capped at `top_n`.
///
/// `rows` is the frame the fit was computed on; `flags` is aligned with the
/// fit's per-row vectors.
pub fn rank_outliers(rows: &[AnalysisRow], fit: &FitResult, flags: &[bool], top_n: usize) -> Vec<OutlierRow> {
    let mut out: Vec<OutlierRow> = fit
        .used_rows()
        .iter()
        .enumerate()
        .filter(|(k, _)| flags.get(*k).copied().unwrap_or(false))
        .filter_map(|(k, &i)| {
            let row = rows.get(i)?;
            Some(OutlierRow {
                entity_id: row.entity_id.clone(),
                order_id: row.dims.order_id.clone(),
                order_item_id: row.dims.order_item_id.clone(),
                seller_id: row.dims.seller_id.clone(),
                product_id: row.dims.product_id.clone(),
                distance_km: row.distance_km,
                freight_pct: row.freight_pct,
                fitted: fit.fitted()[k],
                residual: fit.residuals()[k],
                z_score: fit.z_scores()[k],
            })
        })
        .collect();

    out.sort_by(by_abs_z_then_id);
    out.truncate(top_n);
    out
}

fn by_abs_z_then_id(a: &OutlierRow, b: &OutlierRow) -> Ordering {
    b.z_score
        .abs()
        .total_cmp(&a.z_score.abs())
        .then_with(|| a.entity_id.cmp(&b.entity_id))
}

/// Conclusions for the fit; `ranked` is the output of `rank_outliers`.
pub fn summarize(fit: &FitResult, ranked: &[OutlierRow]) -> Insights {
    let variance_explained = format!(
        "The model explains {:.1}% of variation in freight % across the filtered data.",
        fit.r_squared() * 100.0
    );

    let slope_pp = fit.slope_pp_per_km();
    let slope_direction = if slope_pp > 0.0 {
        format!("Freight burden increases with distance by ~{slope_pp:.4} p.p. per km.")
    } else {
        format!("Freight burden does not increase meaningfully with distance (slope: {slope_pp:.4} p.p./km).")
    };

    let lead = ranked.first().map(|worst| InvestigationLead {
        entity_id: worst.entity_id.clone(),
        order_id: worst.order_id.clone(),
        seller_id: worst.seller_id.clone(),
        product_id: worst.product_id.clone(),
        z_score: worst.z_score,
    });

    Insights {
        variance_explained,
        slope_direction,
        lead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RowDims;
    use crate::fit::{classify, fit_ols};

    fn row(id: &str, x: f64, y: f64) -> AnalysisRow {
        AnalysisRow {
            entity_id: id.to_string(),
            distance_km: x,
            freight_pct: y,
            dims: RowDims {
                order_id: id.to_string(),
                seller_id: Some(format!("seller-{id}")),
                ..RowDims::default()
            },
        }
    }

    /// 20 lanes on a gentle trend with one expensive spike at 1000 km.
    fn spiked_rows() -> Vec<AnalysisRow> {
        (1..=20)
            .map(|i| {
                let x = 100.0 * i as f64;
                let noise = if i % 2 == 0 { 0.002 } else { -0.002 };
                let spike = if i == 10 { 0.5 } else { 0.0 };
                row(&format!("o{i:02}"), x, 0.02 + 0.0001 * x + noise + spike)
            })
            .collect()
    }

    fn fit_rows(rows: &[AnalysisRow]) -> FitResult {
        let x: Vec<f64> = rows.iter().map(|r| r.distance_km).collect();
        let y: Vec<f64> = rows.iter().map(|r| r.freight_pct).collect();
        fit_ols(&x, &y).unwrap()
    }

    #[test]
    fn spike_is_the_sole_outlier_and_the_lead() {
        let rows = spiked_rows();
        let fit = fit_rows(&rows);
        let flags = classify(fit.z_scores(), 2.5);
        let ranked = rank_outliers(&rows, &fit, &flags, 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].entity_id, "o10");
        assert!(ranked[0].residual > 0.0);

        let insights = summarize(&fit, &ranked);
        let lead = insights.lead.as_ref().unwrap();
        assert_eq!(lead.seller_id.as_deref(), Some("seller-o10"));
        assert!(insights.slope_direction.contains("increases"));
        assert_eq!(insights.lines().len(), 3);
    }

    fn outlier(id: &str, z: f64) -> OutlierRow {
        OutlierRow {
            entity_id: id.to_string(),
            order_id: id.to_string(),
            order_item_id: None,
            seller_id: None,
            product_id: None,
            distance_km: 0.0,
            freight_pct: 0.0,
            fitted: 0.0,
            residual: z,
            z_score: z,
        }
    }

    #[test]
    fn ordering_is_abs_z_desc_then_entity_asc() {
        let mut rows = vec![
            outlier("d", 3.0),
            outlier("b", -3.0),
            outlier("a", 2.6),
            outlier("c", 3.0),
            outlier("e", -4.1),
        ];
        rows.sort_by(by_abs_z_then_id);
        let ids: Vec<&str> = rows.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["e", "b", "c", "d", "a"]);
    }

    #[test]
    fn top_n_caps_the_table() {
        let rows = spiked_rows();
        let fit = fit_rows(&rows);
        let flags = classify(fit.z_scores(), 0.2);
        let all = rank_outliers(&rows, &fit, &flags, usize::MAX);
        let top3 = rank_outliers(&rows, &fit, &flags, 3);

        assert!(all.len() > 3);
        assert_eq!(top3, all[..3].to_vec());
        assert_eq!(top3[0].entity_id, "o10");
    }

    #[test]
    fn flat_slope_and_no_outliers() {
        let rows = vec![row("a", 0.0, 0.3), row("b", 1.0, 0.1), row("c", 2.0, 0.2), row("d", 3.0, 0.1)];
        let fit = fit_rows(&rows);
        let ranked = rank_outliers(&rows, &fit, &classify(fit.z_scores(), 5.0), 10);
        let insights = summarize(&fit, &ranked);

        assert!(ranked.is_empty());
        assert!(insights.lead.is_none());
        assert!(insights.slope_direction.contains("does not increase"));
        assert_eq!(insights.lines().len(), 2);
    }
}
