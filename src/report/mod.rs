//! Reporting utilities: row maxima and formatted summaries.
//!
//! Formatting lives here so the scan code only produces numbers.

pub mod format;

pub use format::*;

use ndarray::ArrayView1;

/// Index of the largest visited, non-NaN value in one modulus row.
///
/// Ties keep the first index.
pub fn row_maximum(log_likelihood: ArrayView1<'_, f64>, visited: ArrayView1<'_, bool>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, (&v, &seen)) in log_likelihood.iter().zip(visited.iter()).enumerate() {
        if !seen || v.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, bv)| v > bv) {
            best = Some((j, v));
        }
    }
    best.map(|(j, _)| j)
}
