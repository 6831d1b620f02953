//! Interval estimators used by `GridSearch::err_with`.
//!
//! Two strategies share one trait: the fast grid heuristic (a rough
//! approximation with tunable thresholds) and a posterior-resampling estimator
//! that draws grid cells with likelihood weights.

use log::warn;
use ndarray::Array2;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{IntervalConfig, Interval, NAN_INTERVAL, ONE_SIGMA, TargetPixels};
use crate::engine::ProfileLikelihood;
use crate::error::ScanError;
use crate::math::Parabola;

/// Read-only view of a finished sweep.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    pub log_likelihood: &'a Array2<f64>,
    pub visited: &'a Array2<bool>,
    pub distance_modulus: &'a [f64],
    pub pixels: &'a TargetPixels,
}

impl GridView<'_> {
    fn is_positive(&self, i: usize, j: usize) -> bool {
        self.visited[[i, j]] && self.log_likelihood[[i, j]] > 0.0
    }

    /// Visited cells with a finite likelihood, modulus-major.
    fn finite_cells(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.log_likelihood
            .indexed_iter()
            .filter(|&(idx, v)| self.visited[idx] && v.is_finite())
            .map(|(idx, &v)| (idx, v))
    }
}

pub trait IntervalEstimator {
    /// Distance-modulus interval around the best cell `(i, j)`.
    fn distance_modulus_interval(&self, view: &GridView<'_>, best: (usize, usize)) -> Result<Interval, ScanError>;

    /// `(lon, lat)` intervals around the best cell `(i, j)`.
    fn position_interval(
        &self,
        view: &GridView<'_>,
        best: (usize, usize),
    ) -> Result<(Interval, Interval), ScanError>;
}

/// Grid-based rough error heuristic.
///
/// Distance modulus: once the best pixel column has enough positive cells, a
/// parabola through `(dm, 2 x logL)` of every visited cell in that column,
/// anchored at `(0, 0)`, turned into a symmetric interval about the best
/// modulus. Position: bounding box of the best row's cells within
/// `ts_threshold` of the maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeuristic {
    pub ts_threshold: f64,
    pub min_modulus_samples: usize,
    pub min_position_samples: usize,
    pub confidence: f64,
}

impl GridHeuristic {
    pub fn from_config(config: &IntervalConfig) -> Self {
        Self {
            ts_threshold: config.ts_threshold,
            min_modulus_samples: config.min_modulus_samples,
            min_position_samples: config.min_position_samples,
            confidence: config.modulus_confidence,
        }
    }
}

impl Default for GridHeuristic {
    fn default() -> Self {
        Self::from_config(&IntervalConfig::default())
    }
}

impl IntervalEstimator for GridHeuristic {
    fn distance_modulus_interval(&self, view: &GridView<'_>, (i, j): (usize, usize)) -> Result<Interval, ScanError> {
        let n_moduli = view.distance_modulus.len();
        let n_positive = (0..n_moduli).filter(|&k| view.is_positive(k, j)).count();
        if n_positive < self.min_modulus_samples {
            return Ok(NAN_INTERVAL);
        }

        // Positive cells only gate the estimate; the fit uses the whole column.
        let mut x = vec![0.0];
        let mut y = vec![0.0];
        for k in (0..n_moduli).filter(|&k| view.visited[[k, j]]) {
            x.push(view.distance_modulus[k]);
            y.push(2.0 * view.log_likelihood[[k, j]]);
        }

        let parabola = match Parabola::new(&x, &y) {
            Ok(p) => p,
            Err(e) => {
                warn!("Distance modulus interval unavailable: {e}");
                return Ok(NAN_INTERVAL);
            }
        };
        let (lo, hi) = parabola.confidence_interval(self.confidence);
        if !(lo.is_finite() && hi.is_finite()) {
            return Ok(NAN_INTERVAL);
        }

        let half_width = (hi - lo) / 2.0;
        let dm = view.distance_modulus[i];
        Ok([dm - half_width, dm + half_width])
    }

    fn position_interval(
        &self,
        view: &GridView<'_>,
        (i, j): (usize, usize),
    ) -> Result<(Interval, Interval), ScanError> {
        let n_pixels = view.pixels.len();
        let n_positive = (0..n_pixels).filter(|&k| view.is_positive(i, k)).count();
        if n_positive < self.min_position_samples {
            return Ok((NAN_INTERVAL, NAN_INTERVAL));
        }

        let best = view.log_likelihood[[i, j]];
        let mut lon = [f64::INFINITY, f64::NEG_INFINITY];
        let mut lat = [f64::INFINITY, f64::NEG_INFINITY];
        for k in 0..n_pixels {
            if !view.visited[[i, k]] || 2.0 * (best - view.log_likelihood[[i, k]]) >= self.ts_threshold {
                continue;
            }
            lon = [lon[0].min(view.pixels.lon[k]), lon[1].max(view.pixels.lon[k])];
            lat = [lat[0].min(view.pixels.lat[k]), lat[1].max(view.pixels.lat[k])];
        }
        Ok((lon, lat))
    }
}

/// Resample grid cells with weight `exp(logL - max)` and report central ranges.
///
/// Treats the visited grid as a discretized posterior under a flat prior.
/// Deterministic for a given `seed`.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorResampling {
    pub samples: usize,
    pub seed: u64,
    pub confidence: f64,
}

impl Default for PosteriorResampling {
    fn default() -> Self {
        Self {
            samples: 10_000,
            seed: 0,
            confidence: ONE_SIGMA,
        }
    }
}

impl PosteriorResampling {
    /// Drawn cell indices, or `None` when no cell carries weight.
    fn draw(&self, view: &GridView<'_>) -> Option<Vec<(usize, usize)>> {
        let cells: Vec<((usize, usize), f64)> = view.finite_cells().collect();
        let max = cells.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
        if cells.is_empty() || self.samples == 0 {
            return None;
        }

        let weights = cells.iter().map(|&(_, v)| (v - max).exp());
        let dist = match WeightedIndex::new(weights) {
            Ok(d) => d,
            Err(e) => {
                warn!("Posterior resampling unavailable: {e}");
                return None;
            }
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        Some((0..self.samples).map(|_| cells[dist.sample(&mut rng)].0).collect())
    }
}

impl IntervalEstimator for PosteriorResampling {
    fn distance_modulus_interval(&self, view: &GridView<'_>, _best: (usize, usize)) -> Result<Interval, ScanError> {
        let Some(draws) = self.draw(view) else {
            return Ok(NAN_INTERVAL);
        };
        let mut dm: Vec<f64> = draws.iter().map(|&(i, _)| view.distance_modulus[i]).collect();
        Ok(central_interval(&mut dm, self.confidence))
    }

    fn position_interval(
        &self,
        view: &GridView<'_>,
        _best: (usize, usize),
    ) -> Result<(Interval, Interval), ScanError> {
        let Some(draws) = self.draw(view) else {
            return Ok((NAN_INTERVAL, NAN_INTERVAL));
        };
        let mut lon: Vec<f64> = draws.iter().map(|&(_, j)| view.pixels.lon[j]).collect();
        let mut lat: Vec<f64> = draws.iter().map(|&(_, j)| view.pixels.lat[j]).collect();
        Ok((
            central_interval(&mut lon, self.confidence),
            central_interval(&mut lat, self.confidence),
        ))
    }
}

/// Central `confidence` range of `values` (sorted in place), linearly
/// interpolated between order statistics.
pub fn central_interval(values: &mut [f64], confidence: f64) -> Interval {
    if values.is_empty() {
        return NAN_INTERVAL;
    }
    values.sort_by(f64::total_cmp);
    let tail = (1.0 - confidence.clamp(0.0, 1.0)) / 2.0;
    [quantile_sorted(values, tail), quantile_sorted(values, 1.0 - tail)]
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
