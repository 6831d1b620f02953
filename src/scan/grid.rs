//! The grid search itself.
//!
//! Iteration order is fixed: distance modulus outer (ascending index), target
//! pixel inner (ascending index). The engine's distance modulus is staged once
//! per row; each cell only moves the position before syncing.

use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;

use crate::domain::{ErrRecord, IntervalConfig, MleRecord, ParamUpdate, ScanConfig};
use crate::engine::{LikelihoodEngine, ProfileLikelihood, RegionGeometry, mean_or_nan};
use crate::error::ScanError;
use crate::io::{JsonSparseMapWriter, SparseMapFile, SparseMapWriter, read_color_lut};
use crate::report::row_maximum;
use crate::scan::{
    CellResult, Field, GridHeuristic, GridView, IntervalEstimator, PrecomputeCache, SparseArrays,
    build_sparse_map, precompute,
};

/// Optional restriction of a sweep to one pixel and/or one modulus.
///
/// Both are resolved to the nearest grid index; neither needs to match a grid
/// point exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Restriction {
    pub coords: Option<(f64, f64)>,
    pub distance_modulus: Option<f64>,
}

impl Restriction {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn at_coords(lon: f64, lat: f64) -> Self {
        Self::default().with_coords(lon, lat)
    }

    pub fn at_distance_modulus(distance_modulus: f64) -> Self {
        Self::default().with_distance_modulus(distance_modulus)
    }

    pub fn with_coords(mut self, lon: f64, lat: f64) -> Self {
        self.coords = Some((lon, lat));
        self
    }

    pub fn with_distance_modulus(mut self, distance_modulus: f64) -> Self {
        self.distance_modulus = Some(distance_modulus);
        self
    }
}

/// Index of the modulus closest to `distance_modulus` (first on ties).
pub fn nearest_modulus_index(moduli: &[f64], distance_modulus: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &m) in moduli.iter().enumerate() {
        let diff = (m - distance_modulus).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}

/// Sweeps a likelihood engine over (distance modulus x target pixel).
///
/// Owns the result arrays and the precompute cache. The engine is mutated in
/// place during a sweep and nothing else may drive it meanwhile.
#[derive(Debug)]
pub struct GridSearch<R, E> {
    config: ScanConfig,
    region: R,
    engine: E,
    distance_modulus: Vec<f64>,
    stellar_mass_conversion: f64,
    arrays: SparseArrays,
    cache: Option<PrecomputeCache>,
}

impl<R: RegionGeometry, E: LikelihoodEngine> GridSearch<R, E> {
    pub fn new(config: ScanConfig, region: R, engine: E) -> Result<Self, ScanError> {
        config.validate()?;
        let n_pixels = region.target_pixels().len();
        if n_pixels == 0 {
            return Err(ScanError::config("Region has no target pixels."));
        }

        let distance_modulus = config.distance_modulus_array.clone();
        let stellar_mass_conversion = engine.stellar_mass();
        info!(
            "Grid search over {} distance moduli x {n_pixels} target pixels (stellar mass conversion {stellar_mass_conversion:.4})",
            distance_modulus.len()
        );

        Ok(Self {
            arrays: SparseArrays::zeros(distance_modulus.len(), n_pixels),
            config,
            region,
            engine,
            distance_modulus,
            stellar_mass_conversion,
            cache: None,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn distance_modulus(&self) -> &[f64] {
        &self.distance_modulus
    }

    pub fn stellar_mass_conversion(&self) -> f64 {
        self.stellar_mass_conversion
    }

    pub fn arrays(&self) -> &SparseArrays {
        &self.arrays
    }

    pub fn cache(&self) -> Option<&PrecomputeCache> {
        self.cache.as_ref()
    }

    /// Precompute signal color and observable fraction for every modulus.
    ///
    /// An explicit `distance_modulus` sequence replaces the configured one
    /// (and resets the result arrays to the new shape).
    pub fn precompute(&mut self, distance_modulus: Option<Vec<f64>>) -> Result<&PrecomputeCache, ScanError> {
        if let Some(moduli) = distance_modulus {
            if moduli.is_empty() || moduli.iter().any(|v| !v.is_finite()) {
                return Err(ScanError::config(
                    "Precompute distance moduli must be a non-empty sequence of finite values.",
                ));
            }
            self.arrays = SparseArrays::zeros(moduli.len(), self.region.target_pixels().len());
            self.distance_modulus = moduli;
        }

        let lut = match &self.config.color_lut_infile {
            Some(path) => Some(read_color_lut(path)?),
            None => None,
        };
        let cache = precompute(&self.engine, &self.distance_modulus, lut.as_ref())?;
        Ok(self.cache.insert(cache))
    }

    fn resolve(&self, restriction: &Restriction) -> Result<(Option<usize>, Option<usize>), ScanError> {
        let n_pixels = self.region.target_pixels().len();
        let coord_idx = match restriction.coords {
            Some((lon, lat)) => {
                let j = self.region.index_target(lon, lat);
                if j >= n_pixels {
                    return Err(ScanError::config(format!(
                        "Region resolved ({lon}, {lat}) to pixel index {j} of {n_pixels}."
                    )));
                }
                Some(j)
            }
            None => None,
        };
        let modulus_idx = restriction
            .distance_modulus
            .map(|dm| nearest_modulus_index(&self.distance_modulus, dm));
        Ok((coord_idx, modulus_idx))
    }

    /// Sequential sweep. Repopulates all seven arrays at shape `[M, P]`.
    ///
    /// An engine failure aborts the sweep at the failing cell.
    pub fn search(&mut self, restriction: Restriction) -> Result<(), ScanError> {
        let m = self.distance_modulus.len();
        let p = self.region.target_pixels().len();
        self.arrays = SparseArrays::zeros(m, p);
        let (coord_idx, modulus_idx) = self.resolve(&restriction)?;

        info!("Looping over distance moduli in grid search ...");
        for i in 0..m {
            if modulus_idx.is_some_and(|k| k != i) {
                continue;
            }
            let dm = self.distance_modulus[i];
            info!("  ({:<2}/{m}) Distance Modulus={dm:.1} ...", i + 1);

            self.engine.set_params(ParamUpdate::distance_modulus(dm));
            if let Some((u_color, fraction)) = cached_row(self.cache.as_ref(), &self.distance_modulus, i) {
                self.engine.use_precomputed(u_color, fraction);
            }

            let pixels = self.region.target_pixels();
            for j in 0..p {
                if coord_idx.is_some_and(|k| k != j) {
                    continue;
                }
                let cell = evaluate_cell(
                    &mut self.engine,
                    (pixels.lon[j], pixels.lat[j]),
                    (j, p),
                    self.stellar_mass_conversion,
                    self.config.full_pdf,
                    &self.config.intervals,
                )?;
                self.arrays.store(i, j, &cell);
            }

            self.log_row_maximum(i);
        }
        Ok(())
    }

    fn log_row_maximum(&self, i: usize) {
        let ll = self.arrays.log_likelihood();
        let Some(j) = row_maximum(ll.row(i), self.arrays.visited().row(i)) else {
            return;
        };
        let pixels = self.region.target_pixels();
        info!(
            "  ({:<3}/{}) Maximum at ({:.2}, {:.2}) ... TS={:.1}, Stellar Mass={:.1}",
            j + 1,
            pixels.len(),
            pixels.lon[j],
            pixels.lat[j],
            2.0 * ll[[i, j]],
            self.arrays.get(Field::StellarMass)[[i, j]],
        );
    }

    /// Visited cell with the largest log-likelihood (first in scan order on ties).
    pub fn best_cell(&self) -> Option<(usize, usize)> {
        self.arrays.argmax_visited()
    }

    /// Point estimate at the maximum-likelihood cell.
    ///
    /// Shape and population parameters come from the engine's current state
    /// and are NaN when the engine does not carry them.
    pub fn mle(&self) -> Result<MleRecord, ScanError> {
        let (i, j) = self.best_cell().ok_or(ScanError::NoResults)?;
        Ok(self.record_at(i, j))
    }

    fn record_at(&self, i: usize, j: usize) -> MleRecord {
        let pixels = self.region.target_pixels();
        let shape = self.engine.shape();
        MleRecord {
            richness: self.arrays.richness()[[i, j]],
            lon: pixels.lon[j],
            lat: pixels.lat[j],
            distance_modulus: self.distance_modulus[i],
            extension: shape.extension.unwrap_or(f64::NAN),
            ellipticity: shape.ellipticity.unwrap_or(f64::NAN),
            position_angle: shape.position_angle.unwrap_or(f64::NAN),
            age: mean_or_nan(self.engine.ages()),
            metallicity: mean_or_nan(self.engine.metallicities()),
        }
    }

    /// Rough intervals around the MLE using the configured grid heuristic.
    pub fn err(&mut self) -> Result<ErrRecord, ScanError> {
        let heuristic = GridHeuristic::from_config(&self.config.intervals);
        self.err_with(&heuristic)
    }

    /// Re-fit at the MLE cell, then estimate intervals with `estimator`.
    pub fn err_with<S: IntervalEstimator + ?Sized>(&mut self, estimator: &S) -> Result<ErrRecord, ScanError> {
        let (i, j) = self.best_cell().ok_or(ScanError::NoResults)?;
        let dm = self.distance_modulus[i];
        let (lon, lat) = {
            let pixels = self.region.target_pixels();
            (pixels.lon[j], pixels.lat[j])
        };

        self.engine.evaluate(dm, lon, lat)?;
        let mut err = ErrRecord::unknown(self.record_at(i, j));

        let (lo, hi) = self
            .engine
            .richness_interval(self.config.intervals.richness_confidence)?;
        err.richness = [lo, hi];

        let view = GridView {
            log_likelihood: self.arrays.log_likelihood(),
            visited: self.arrays.visited(),
            distance_modulus: &self.distance_modulus,
            pixels: self.region.target_pixels(),
        };
        err.distance_modulus = estimator.distance_modulus_interval(&view, (i, j))?;
        let (lon_interval, lat_interval) = estimator.position_interval(&view, (i, j))?;
        err.lon = lon_interval;
        err.lat = lat_interval;
        Ok(err)
    }

    /// Sparse-map view of the current results (pixel axis leading).
    pub fn sparse_map(&self) -> SparseMapFile {
        build_sparse_map(
            &self.arrays,
            &self.distance_modulus,
            &self.region,
            &self.engine,
            &self.config,
            self.stellar_mass_conversion,
        )
    }

    pub fn write<W: SparseMapWriter + ?Sized>(&self, writer: &W) -> Result<(), ScanError> {
        writer.write_sparse_map(&self.sparse_map())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ScanError> {
        self.write(&JsonSparseMapWriter::new(path))
    }
}

impl<R, E> GridSearch<R, E>
where
    R: RegionGeometry + Sync,
    E: LikelihoodEngine + Clone + Send + Sync,
{
    /// Sweep with one private engine clone per distance modulus.
    ///
    /// Rows run concurrently; cells within a row stay sequential. Produces the
    /// same arrays as [`GridSearch::search`].
    pub fn search_parallel(&mut self, restriction: Restriction) -> Result<(), ScanError> {
        let m = self.distance_modulus.len();
        let p = self.region.target_pixels().len();
        self.arrays = SparseArrays::zeros(m, p);
        let (coord_idx, modulus_idx) = self.resolve(&restriction)?;
        let rows: Vec<usize> = (0..m).filter(|&i| modulus_idx.is_none_or(|k| k == i)).collect();

        let template = &self.engine;
        let pixels = self.region.target_pixels();
        let moduli = &self.distance_modulus;
        let cache = self.cache.as_ref();
        let conversion = self.stellar_mass_conversion;
        let full_pdf = self.config.full_pdf;
        let intervals = &self.config.intervals;

        info!("Sweeping {} distance moduli in parallel ...", rows.len());
        let results: Vec<RowOutcome> = rows
            .par_iter()
            .map(|&i| {
                let mut engine = template.clone();
                engine.set_params(ParamUpdate::distance_modulus(moduli[i]));
                if let Some((u_color, fraction)) = cached_row(cache, moduli, i) {
                    engine.use_precomputed(u_color, fraction);
                }

                let mut cells = Vec::with_capacity(if coord_idx.is_some() { 1 } else { p });
                for j in 0..p {
                    if coord_idx.is_some_and(|k| k != j) {
                        continue;
                    }
                    match evaluate_cell(
                        &mut engine,
                        (pixels.lon[j], pixels.lat[j]),
                        (j, p),
                        conversion,
                        full_pdf,
                        intervals,
                    ) {
                        Ok(cell) => cells.push((j, cell)),
                        Err(e) => return RowOutcome { i, cells, error: Some(e) },
                    }
                }
                RowOutcome { i, cells, error: None }
            })
            .collect();

        // Merge in row order and stop at the first failure, leaving the same
        // cells stored as the sequential sweep would.
        for row in results {
            for (j, cell) in &row.cells {
                self.arrays.store(row.i, *j, cell);
            }
            if let Some(e) = row.error {
                return Err(e);
            }
            self.log_row_maximum(row.i);
        }
        Ok(())
    }
}

/// Cells one parallel row finished, and the error that stopped it (if any).
struct RowOutcome {
    i: usize,
    cells: Vec<(usize, CellResult)>,
    error: Option<ScanError>,
}

fn cached_row<'a>(
    cache: Option<&'a PrecomputeCache>,
    moduli: &[f64],
    i: usize,
) -> Option<(&'a [f64], &'a [f64])> {
    cache.filter(|c| c.distance_modulus() == moduli)?.row(i)
}

/// Move the engine to one pixel, sync, fit, and collect the cell's results.
fn evaluate_cell<E: LikelihoodEngine>(
    engine: &mut E,
    (lon, lat): (f64, f64),
    (j, n_pixels): (usize, usize),
    stellar_mass_conversion: f64,
    full_pdf: bool,
    intervals: &IntervalConfig,
) -> Result<CellResult, ScanError> {
    engine.set_params(ParamUpdate::position(lon, lat));
    engine.sync_params()?;

    let fit = engine.fit_richness()?;
    let mut cell = CellResult {
        log_likelihood: fit.log_likelihood,
        richness: fit.richness,
        stellar_mass: stellar_mass_conversion * fit.richness,
        fraction_observable: engine.observable_fraction(),
        ..CellResult::default()
    };

    if full_pdf {
        let (lo, hi) = engine.richness_interval(intervals.richness_confidence)?;
        cell.richness_lower = lo;
        cell.richness_upper = hi;
        cell.richness_limit = fit.profile.bayesian_upper_limit(intervals.upper_limit_confidence);
        debug!(
            "    ({:<3}/{n_pixels}) Candidate at ({:.2}, {:.2}) ... TS={:.1}, Stellar Mass={:.1} ({:.1} -- {:.1} @ {:.2} CL, < {:.1} @ {:.2} CL)",
            j + 1,
            engine.lon(),
            engine.lat(),
            cell.ts(),
            cell.stellar_mass,
            stellar_mass_conversion * lo,
            stellar_mass_conversion * hi,
            intervals.richness_confidence,
            stellar_mass_conversion * cell.richness_limit,
            intervals.upper_limit_confidence,
        );
    } else {
        debug!(
            "    ({:<3}/{n_pixels}) Candidate at ({:.2}, {:.2}) ... TS={:.1}, Stellar Mass={:.1}, Fraction={:.2}",
            j + 1,
            engine.lon(),
            engine.lat(),
            cell.ts(),
            cell.stellar_mass,
            cell.fraction_observable,
        );
    }
    Ok(cell)
}
