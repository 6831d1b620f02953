//! Deterministic stand-ins for the likelihood engine and region geometry.
//!
//! The mock engine serves log-likelihoods from a fixed `[M, P]` surface and
//! records every parameter update, sync and precompute hand-off so tests can
//! check how the sweep drives it.

use crate::domain::{ParamUpdate, Photometry, ShapeParams, TargetPixels};
use crate::engine::{LikelihoodEngine, ProfileLikelihood, RegionGeometry, RichnessFit};
use crate::error::ScanError;

pub const STELLAR_MASS_CONVERSION: f64 = 2.5;

pub fn pixel_lon(j: usize) -> f64 {
    30.0 + 0.1 * j as f64
}

pub fn pixel_lat(j: usize) -> f64 {
    -10.0 + 0.05 * j as f64
}

#[derive(Debug, Clone)]
pub struct MockRegion {
    pixels: TargetPixels,
}

impl MockRegion {
    pub fn new(n_pixels: usize) -> Self {
        let pixels = TargetPixels::new(
            (0..n_pixels as u64).map(|j| 5000 + j).collect(),
            (0..n_pixels).map(pixel_lon).collect(),
            (0..n_pixels).map(pixel_lat).collect(),
        )
        .unwrap();
        Self { pixels }
    }
}

impl RegionGeometry for MockRegion {
    fn target_pixels(&self) -> &TargetPixels {
        &self.pixels
    }

    fn in_roi(&self, lon: &[f64], _lat: &[f64]) -> Vec<bool> {
        vec![true; lon.len()]
    }

    fn in_annulus(&self, lon: &[f64], _lat: &[f64]) -> Vec<bool> {
        lon.iter().map(|&l| l >= 30.5).collect()
    }

    fn in_interior(&self, lon: &[f64], _lat: &[f64]) -> Vec<bool> {
        lon.iter().map(|&l| l < 30.2).collect()
    }

    fn in_target(&self, lon: &[f64], _lat: &[f64]) -> Vec<bool> {
        lon.iter().map(|&l| l < 30.1).collect()
    }

    fn likelihood_pixel(&self, nside: u32) -> u64 {
        1000 + nside as u64
    }
}

/// Profile whose answers are simple functions of the fitted richness.
#[derive(Debug, Clone, Copy)]
pub struct MockProfile {
    pub richness: f64,
}

impl ProfileLikelihood for MockProfile {
    fn confidence_interval(&self, _level: f64) -> (f64, f64) {
        (0.5 * self.richness, 1.5 * self.richness)
    }

    fn bayesian_upper_limit(&self, level: f64) -> f64 {
        self.richness + 3.0 * level
    }

    fn profile_upper_limit(&self, delta: f64) -> f64 {
        self.richness + delta
    }
}

#[derive(Debug, Clone)]
pub struct MockEngine {
    pub moduli: Vec<f64>,
    pub log_likelihood: Vec<Vec<f64>>,
    pending: (f64, f64, f64),
    synced: (f64, f64, f64),
    pub updates: Vec<ParamUpdate>,
    pub syncs: usize,
    pub precomputed_rows: usize,
    pub fail_at: Option<(usize, usize)>,
    pub fail_precompute: bool,
    pub with_population: bool,
    ages: Vec<f64>,
    metallicities: Vec<f64>,
    photometry: Photometry,
    catalog_lon: Vec<f64>,
    catalog_lat: Vec<f64>,
}

impl MockEngine {
    /// Engine over `moduli x n_pixels` whose log-likelihood is `f(i, j)`.
    pub fn surface(moduli: Vec<f64>, n_pixels: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let log_likelihood = (0..moduli.len())
            .map(|i| (0..n_pixels).map(|j| f(i, j)).collect())
            .collect();
        Self {
            moduli,
            log_likelihood,
            pending: (f64::NAN, f64::NAN, f64::NAN),
            synced: (f64::NAN, f64::NAN, f64::NAN),
            updates: Vec::new(),
            syncs: 0,
            precomputed_rows: 0,
            fail_at: None,
            fail_precompute: false,
            with_population: true,
            ages: vec![10.0, 12.0],
            metallicities: vec![0.0001, 0.0003],
            photometry: Photometry {
                mag_1: vec![20.5, 21.5],
                mag_2: vec![19.5, 20.5],
                mag_err_1: vec![0.01, 0.01],
                mag_err_2: vec![0.01, 0.01],
            },
            catalog_lon: vec![30.0, 30.15, 30.3, 30.6],
            catalog_lat: vec![-10.0; 4],
        }
    }

    /// Engine over a single modulus row.
    pub fn row(distance_modulus: f64, log_likelihood: &[f64]) -> Self {
        Self::surface(vec![distance_modulus], log_likelihood.len(), |_, j| log_likelihood[j])
    }

    /// Richness served for cell `(i, j)`.
    pub fn richness_at(&self, i: usize, j: usize) -> f64 {
        let n_pixels = self.log_likelihood.first().map_or(0, |r| r.len());
        1.0 + 0.5 * (i * n_pixels + j) as f64
    }

    /// Observable fraction served for cell `(i, j)`.
    pub fn fraction_at(i: usize, j: usize) -> f64 {
        0.5 + 0.01 * j as f64 + 0.001 * i as f64
    }

    fn synced_cell(&self) -> Result<(usize, usize), ScanError> {
        let (dm, lon, _) = self.synced;
        let i = self
            .moduli
            .iter()
            .position(|&m| m == dm)
            .ok_or_else(|| ScanError::engine(format!("unknown distance modulus {dm}")))?;
        let n_pixels = self.log_likelihood[i].len();
        let j = (0..n_pixels)
            .find(|&j| pixel_lon(j) == lon)
            .ok_or_else(|| ScanError::engine(format!("unknown position lon={lon}")))?;
        Ok((i, j))
    }
}

impl LikelihoodEngine for MockEngine {
    type Profile = MockProfile;

    fn set_params(&mut self, update: ParamUpdate) {
        if let Some(dm) = update.distance_modulus {
            self.pending.0 = dm;
        }
        if let Some(lon) = update.lon {
            self.pending.1 = lon;
        }
        if let Some(lat) = update.lat {
            self.pending.2 = lat;
        }
        self.updates.push(update);
    }

    fn sync_params(&mut self) -> Result<(), ScanError> {
        self.synced = self.pending;
        self.syncs += 1;
        Ok(())
    }

    fn fit_richness(&mut self) -> Result<RichnessFit<MockProfile>, ScanError> {
        let (i, j) = self.synced_cell()?;
        if self.fail_at == Some((i, j)) {
            return Err(ScanError::engine(format!("fit did not converge at ({i}, {j})")));
        }
        let richness = self.richness_at(i, j);
        Ok(RichnessFit {
            log_likelihood: self.log_likelihood[i][j],
            richness,
            profile: MockProfile { richness },
        })
    }

    fn richness_interval(&mut self, _confidence: f64) -> Result<(f64, f64), ScanError> {
        let (i, j) = self.synced_cell()?;
        let r = self.richness_at(i, j);
        Ok((0.5 * r, 1.5 * r))
    }

    fn calc_signal_color(&self, distance_modulus: f64) -> Result<Vec<f64>, ScanError> {
        if self.fail_precompute {
            return Err(ScanError::engine("signal color unavailable"));
        }
        Ok(vec![0.01 * distance_modulus; self.photometry.len()])
    }

    fn calc_observable_fraction(&self, distance_modulus: f64) -> Result<Vec<f64>, ScanError> {
        if self.fail_precompute {
            return Err(ScanError::engine("observable fraction unavailable"));
        }
        Ok(vec![1.0 / distance_modulus; 4])
    }

    fn stellar_mass(&self) -> f64 {
        STELLAR_MASS_CONVERSION
    }

    fn lon(&self) -> f64 {
        self.synced.1
    }

    fn lat(&self) -> f64 {
        self.synced.2
    }

    fn observable_fraction(&self) -> f64 {
        self.synced_cell()
            .map(|(i, j)| Self::fraction_at(i, j))
            .unwrap_or(f64::NAN)
    }

    fn catalog_coords(&self) -> (&[f64], &[f64]) {
        (&self.catalog_lon, &self.catalog_lat)
    }

    fn photometry(&self) -> &Photometry {
        &self.photometry
    }

    fn shape(&self) -> ShapeParams {
        ShapeParams {
            extension: Some(0.1),
            ellipticity: Some(0.2),
            position_angle: Some(30.0),
        }
    }

    fn ages(&self) -> Option<&[f64]> {
        self.with_population.then_some(self.ages.as_slice())
    }

    fn metallicities(&self) -> Option<&[f64]> {
        self.with_population.then_some(self.metallicities.as_slice())
    }

    fn use_precomputed(&mut self, _signal_color: &[f64], _observable_fraction: &[f64]) {
        self.precomputed_rows += 1;
    }
}
