//! Residual standardization and outlier flags.

/// `residual / sigma`, or the raw residual when `sigma` is zero (or not finite).
pub fn standardize(residuals: &[f64], sigma: f64) -> Vec<f64> {
    let scale = if sigma.is_finite() && sigma > 0.0 { sigma } else { 1.0 };
    residuals.iter().map(|r| r / scale).collect()
}

/// `|z| > threshold` per row.
pub fn classify(z_scores: &[f64], threshold: f64) -> Vec<bool> {
    z_scores.iter().map(|z| z.abs() > threshold).collect()
}

pub fn count_flagged(flags: &[bool]) -> usize {
    flags.iter().filter(|f| **f).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_keeps_residuals() {
        assert_eq!(standardize(&[0.0, 0.5, -0.5], 0.0), vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn divides_by_sigma() {
        assert_eq!(standardize(&[1.0, -3.0], 2.0), vec![0.5, -1.5]);
    }

    #[test]
    fn threshold_is_strict_and_two_sided() {
        let flags = classify(&[2.5, -2.6, 0.1, 3.0], 2.5);
        assert_eq!(flags, vec![false, true, false, true]);
        assert_eq!(count_flagged(&flags), 2);
    }

    #[test]
    fn raising_threshold_never_adds_outliers() {
        let z = [-3.2, -1.1, 0.0, 0.4, 1.9, 2.2, 2.7, 4.5];
        let mut previous = usize::MAX;
        for step in 0..40 {
            let t = 1.5 + step as f64 * 0.1;
            let n = count_flagged(&classify(&z, t));
            assert!(n <= previous);
            previous = n;
        }
    }
}
