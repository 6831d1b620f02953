//! Small dense least-squares solves.
//!
//! The profile utilities repeatedly solve 3x3 Vandermonde systems
//! `[x^2, x, 1] p = y` through three samples. Samples can sit very close together
//! (dense richness grids), so we go through SVD rather than a plain inverse.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

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

/// Coefficients `[p2, p1, p0]` of the parabola `y = p2 x^2 + p1 x + p0` through
/// three points.
///
/// Returns `None` when two abscissae coincide.
pub fn quadratic_through(x: [f64; 3], y: [f64; 3]) -> Option<[f64; 3]> {
    if x[0] == x[1] || x[1] == x[2] || x[0] == x[2] {
        return None;
    }
    let a = DMatrix::from_row_slice(
        3,
        3,
        &[
            x[0] * x[0], x[0], 1.0,
            x[1] * x[1], x[1], 1.0,
            x[2] * x[2], x[2], 1.0,
        ],
    );
    let b = DVector::from_row_slice(&y);
    let p = solve_least_squares(&a, &b)?;
    Some([p[0], p[1], p[2]])
}
