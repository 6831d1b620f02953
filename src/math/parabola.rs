//! Parabolic profile-likelihood model.
//!
//! Samples `(x, 2 x logL)` are sorted by `x`; the three samples around the peak
//! define the global parabola used for `profile_upper_limit`. Interval and
//! upper-limit queries instead integrate the likelihood `exp(y / 2)` of a
//! densified, piecewise-parabolic version of the curve under a flat prior on
//! `x >= 0`.

use log::warn;

use crate::engine::ProfileLikelihood;
use crate::error::ScanError;
use crate::math::quadratic_through;

/// Default number of integration points for interval queries.
pub const DEFAULT_STEPS: usize = 10_000;

/// Points per segment when densifying the sampled curve.
const DENSIFY_FACTOR: usize = 10;

/// Relative pdf floor below which integration points are discarded.
const PDF_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Parabola {
    x: Vec<f64>,
    y: Vec<f64>,
    p2: f64,
    p1: f64,
    p0: f64,
    vertex_x: f64,
    vertex_y: f64,
    steps: usize,
}

impl Parabola {
    /// Build from paired samples. Requires at least three finite samples.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, ScanError> {
        if x.len() != y.len() {
            return Err(ScanError::config(format!(
                "Parabola sample lengths differ (x={}, y={}).",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 3 {
            return Err(ScanError::config("Parabola needs at least three samples."));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ScanError::config("Parabola samples must be finite."));
        }

        let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();

        let n = y.len();
        let peak = argmax_first(&y);
        let k = if peak == 0 {
            0
        } else if peak == n - 1 {
            n - 3
        } else {
            peak - 1
        };

        let [p2, p1, p0] = quadratic_through([x[k], x[k + 1], x[k + 2]], [y[k], y[k + 1], y[k + 2]])
            .ok_or_else(|| ScanError::config("Parabola samples around the peak share an abscissa."))?;

        Ok(Self {
            x,
            y,
            p2,
            p1,
            p0,
            vertex_x: -p1 / (2.0 * p2),
            vertex_y: p0 - p1 * p1 / (4.0 * p2),
            steps: DEFAULT_STEPS,
        })
    }

    /// Override the number of integration points (minimum 2).
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps.max(2);
        self
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.p2 * x * x + self.p1 * x + self.p0
    }

    pub fn vertex(&self) -> (f64, f64) {
        (self.vertex_x, self.vertex_y)
    }

    pub fn coefficients(&self) -> [f64; 3] {
        [self.p2, self.p1, self.p0]
    }

    /// Resample the curve with `factor` points per input interval, using the
    /// local parabola through each consecutive triple.
    pub fn densify(&self, factor: usize) -> (Vec<f64>, Vec<f64>) {
        let factor = factor.max(2);
        let n = self.x.len();
        let mut xd = Vec::with_capacity((n - 1) * (factor - 1) + 1);
        let mut yd = Vec::with_capacity(xd.capacity());

        for k in 0..n - 2 {
            self.push_segment(k, k, factor, &mut xd, &mut yd);
        }
        self.push_segment(n - 3, n - 2, factor, &mut xd, &mut yd);

        xd.push(self.x[n - 1]);
        yd.push(self.y[n - 1]);
        (xd, yd)
    }

    fn push_segment(&self, k: usize, seg: usize, factor: usize, xd: &mut Vec<f64>, yd: &mut Vec<f64>) {
        let (x0, x1) = (self.x[seg], self.x[seg + 1]);
        let (y0, y1) = (self.y[seg], self.y[seg + 1]);
        let local = quadratic_through(
            [self.x[k], self.x[k + 1], self.x[k + 2]],
            [self.y[k], self.y[k + 1], self.y[k + 2]],
        );

        for s in 0..factor - 1 {
            let u = s as f64 / (factor as f64 - 1.0);
            let xs = x0 + u * (x1 - x0);
            // Coincident abscissae: fall back to the straight segment.
            let ys = match local {
                Some([a, b, c]) => a * xs * xs + b * xs + c,
                None => y0 + u * (y1 - y0),
            };
            xd.push(xs);
            yd.push(ys);
        }
    }

    /// Integration grid and unnormalized likelihood on `[max(0, x_min), x_max]`.
    fn flat_prior_pdf(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let (xd, mut yd) = self.densify(DENSIFY_FACTOR);
        let ymax = yd.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for v in &mut yd {
            *v -= ymax;
        }

        let lo = xd[0].max(0.0);
        let hi = xd[xd.len() - 1];
        if !(hi > lo) {
            return None;
        }

        let step = (hi - lo) / (self.steps as f64 - 1.0);
        let grid: Vec<f64> = (0..self.steps).map(|i| lo + step * i as f64).collect();
        let pdf: Vec<f64> = interp_sorted(&grid, &xd, &yd)
            .into_iter()
            .map(|y| (y / 2.0).exp())
            .collect();

        let pmax = pdf.iter().copied().fold(0.0, f64::max);
        if !(pmax > 0.0 && pmax.is_finite()) {
            return None;
        }

        let (x, pdf): (Vec<f64>, Vec<f64>) = grid
            .into_iter()
            .zip(pdf)
            .filter(|(_, p)| p / pmax > PDF_FLOOR)
            .unzip();
        Some((x, pdf))
    }
}

impl ProfileLikelihood for Parabola {
    fn confidence_interval(&self, level: f64) -> (f64, f64) {
        let Some((x, pdf)) = self.flat_prior_pdf() else {
            return (f64::NAN, f64::NAN);
        };

        // Highest-density region: accumulate points in order of decreasing pdf.
        let mut order: Vec<usize> = (0..pdf.len()).collect();
        order.sort_by(|&a, &b| pdf[b].total_cmp(&pdf[a]));

        let total: f64 = pdf.iter().sum();
        let mut acc = 0.0;
        let mut cut = 0;
        let mut best_dist = f64::INFINITY;
        for (rank, &idx) in order.iter().enumerate() {
            acc += pdf[idx];
            let dist = (acc / total - level).powi(2);
            if dist < best_dist {
                best_dist = dist;
                cut = rank;
            }
        }

        let selected = &order[..cut.max(1)];
        let lo = selected.iter().map(|&i| x[i]).fold(f64::INFINITY, f64::min);
        let hi = selected.iter().map(|&i| x[i]).fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }

    fn bayesian_upper_limit(&self, level: f64) -> f64 {
        let Some((x, pdf)) = self.flat_prior_pdf() else {
            return f64::NAN;
        };

        let total: f64 = pdf.iter().sum();
        let mut acc = 0.0;
        let cdf: Vec<f64> = pdf
            .iter()
            .map(|p| {
                acc += p;
                acc / total
            })
            .collect();

        let idx = cdf.partition_point(|&c| c < level);
        if idx == 0 {
            return x[0];
        }
        if idx >= cdf.len() {
            return x[x.len() - 1];
        }
        let (c0, c1) = (cdf[idx - 1], cdf[idx]);
        let (x0, x1) = (x[idx - 1], x[idx]);
        if c1 == c0 {
            x1
        } else {
            x0 + (level - c0) / (c1 - c0) * (x1 - x0)
        }
    }

    fn profile_upper_limit(&self, delta: f64) -> f64 {
        let a = self.p2;
        let b = self.p1;
        let c = if self.vertex_x < 0.0 {
            self.p0 + delta
        } else {
            self.p0 - self.vertex_y + delta
        };

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            warn!("Parabola has no real root {delta} below its peak; returning 0.");
            return 0.0;
        }
        let root = disc.sqrt();
        ((root - b) / (2.0 * a)).max((-root - b) / (2.0 * a))
    }
}

/// Index of the first maximum (NaN never wins).
fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}

/// Linear interpolation of ascending `xs`/`ys` at ascending query points.
///
/// Queries outside `[xs[0], xs[n-1]]` clamp to the end values.
fn interp_sorted(queries: &[f64], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut out = Vec::with_capacity(queries.len());
    let mut k = 0;
    for &q in queries {
        while k + 1 < n && xs[k + 1] < q {
            k += 1;
        }
        let v = if q <= xs[0] {
            ys[0]
        } else if k + 1 >= n {
            ys[n - 1]
        } else {
            let (x0, x1) = (xs[k], xs[k + 1]);
            if x1 == x0 {
                ys[k + 1]
            } else {
                ys[k] + (q - x0) / (x1 - x0) * (ys[k + 1] - ys[k])
            }
        };
        out.push(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_profile(mean: f64, sigma: f64) -> Parabola {
        let x: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|&v| -((v - mean) / sigma).powi(2)).collect();
        Parabola::new(&x, &y).unwrap()
    }

    #[test]
    fn vertex_of_sampled_parabola() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|&v| 10.0 - (v - 3.0) * (v - 3.0)).collect();
        let p = Parabola::new(&x, &y).unwrap();
        let (vx, vy) = p.vertex();
        assert!((vx - 3.0).abs() < 1e-9);
        assert!((vy - 10.0).abs() < 1e-9);
        assert!((p.eval(5.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn coefficients_match_peak_triple() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|&v| -2.0 * v * v + 4.0 * v + 1.0).collect();
        let [p2, p1, p0] = Parabola::new(&x, &y).unwrap().coefficients();
        assert!((p2 + 2.0).abs() < 1e-9);
        assert!((p1 - 4.0).abs() < 1e-9);
        assert!((p0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn coarser_integration_grid_stays_close() {
        let fine = gaussian_profile(5.0, 1.0);
        let coarse = gaussian_profile(5.0, 1.0).with_steps(2_000);
        let (lo, hi) = coarse.confidence_interval(0.6827);
        let (flo, fhi) = fine.confidence_interval(0.6827);
        assert!((lo - flo).abs() < 0.02 && (hi - fhi).abs() < 0.02, "lo={lo} hi={hi}");
        assert!((coarse.bayesian_upper_limit(0.95) - fine.bayesian_upper_limit(0.95)).abs() < 0.02);
    }

    #[test]
    fn unsorted_samples_are_sorted_first() {
        let p = Parabola::new(&[4.0, 0.0, 2.0], &[-4.0, -4.0, 0.0]).unwrap();
        let (vx, _) = p.vertex();
        assert!((vx - 2.0).abs() < 1e-9);
    }

    #[test]
    fn profile_upper_limit_drops_delta_below_peak() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|&v| 10.0 - (v - 3.0) * (v - 3.0)).collect();
        let p = Parabola::new(&x, &y).unwrap();
        let ul = p.profile_upper_limit(2.71);
        assert!((ul - (3.0 + 2.71_f64.sqrt())).abs() < 1e-9, "ul={ul}");
    }

    #[test]
    fn confidence_interval_of_gaussian_is_one_sigma() {
        let p = gaussian_profile(5.0, 1.0);
        let (lo, hi) = p.confidence_interval(0.6827);
        assert!((lo - 4.0).abs() < 0.02, "lo={lo}");
        assert!((hi - 6.0).abs() < 0.02, "hi={hi}");
    }

    #[test]
    fn bayesian_upper_limit_of_gaussian() {
        let p = gaussian_profile(5.0, 1.0);
        let ul = p.bayesian_upper_limit(0.95);
        assert!((ul - 6.645).abs() < 0.02, "ul={ul}");
    }

    #[test]
    fn densify_keeps_sample_points() {
        let p = gaussian_profile(5.0, 1.0);
        let (xd, yd) = p.densify(10);
        assert_eq!(xd.len(), 20 * 9 + 1);
        assert!((xd[9] - 0.5).abs() < 1e-12);
        assert!((yd[xd.len() - 1] + 25.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_too_few_samples() {
        assert!(Parabola::new(&[0.0, 1.0], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn rejects_non_finite_samples() {
        assert!(Parabola::new(&[0.0, 1.0, 2.0], &[0.0, f64::NAN, 1.0]).is_err());
    }
}
