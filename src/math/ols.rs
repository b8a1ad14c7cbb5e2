//! Least squares solver.
//!
//! We solve the small overdetermined system
//!
//! ```text
//! minimize ||y - Xβ||²
//! ```
//!
//! with a thin SVD rather than forming and inverting `XᵀX`, which squares the
//! condition number. Distances in km next to an intercept column of ones make
//! the design matrix badly scaled, so this matters in practice.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.nrows() < x.ncols() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // A rank-deficient design has no unique solution; refuse it instead of
    // returning the minimum-norm answer.
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }
    let rank = svd.rank(max_sv * 1e-12);
    if rank < x.ncols() {
        return None;
    }

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn collinear_columns_are_rejected() {
        // Second column is a constant multiple of the intercept.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 5.0, 1.0, 5.0, 1.0, 5.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
