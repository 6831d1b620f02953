//! Shared domain types.
//!
//! Configuration and summary records are serializable so they can be read from
//! and written to JSON alongside the sparse result maps.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Likelihood-ratio threshold for one degree of freedom at 90% confidence.
pub const DEFAULT_TS_THRESHOLD: f64 = 2.71;

/// Two-sided 1-sigma confidence level.
pub const ONE_SIGMA: f64 = 0.6827;

/// Thresholds used by the interval estimators.
///
/// These are knobs, not truths: the grid heuristic they feed is a rough
/// approximation of the fit uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// `2 x (best - cell)` cut for the sky-position bounding box.
    pub ts_threshold: f64,
    /// Positive-likelihood cells required along the best pixel column.
    pub min_modulus_samples: usize,
    /// Positive-likelihood cells required along the best modulus row.
    pub min_position_samples: usize,
    /// Confidence level of the richness interval.
    pub richness_confidence: f64,
    /// Confidence level of the distance-modulus interval.
    pub modulus_confidence: f64,
    /// One-sided confidence level of the richness upper limit.
    pub upper_limit_confidence: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            ts_threshold: DEFAULT_TS_THRESHOLD,
            min_modulus_samples: 3,
            min_position_samples: 10,
            richness_confidence: ONE_SIGMA,
            modulus_confidence: ONE_SIGMA,
            upper_limit_confidence: 0.95,
        }
    }
}

/// A full scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Ordered distance-modulus hypotheses (first grid axis).
    pub distance_modulus_array: Vec<f64>,
    /// Compute the richness interval and upper limit in every cell.
    pub full_pdf: bool,
    /// Optional precomputed signal-color lookup table.
    pub color_lut_infile: Option<PathBuf>,
    /// Resolution of the likelihood region pixelization (header metadata).
    pub nside_likelihood: u32,
    /// Resolution of the target pixels written to the sparse map.
    pub nside_pixel: u32,
    pub intervals: IntervalConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            distance_modulus_array: Vec::new(),
            full_pdf: false,
            color_lut_infile: None,
            nside_likelihood: 256,
            nside_pixel: 4096,
            intervals: IntervalConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Config with an explicit distance-modulus sequence and defaults elsewhere.
    pub fn with_moduli(distance_modulus_array: Vec<f64>) -> Self {
        Self {
            distance_modulus_array,
            ..Self::default()
        }
    }

    /// Evenly spaced distance moduli between `min` and `max` (inclusive).
    pub fn linear_moduli(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, ScanError> {
        if !(min.is_finite() && max.is_finite() && max >= min) {
            return Err(ScanError::config(format!(
                "Invalid distance modulus range: min={min}, max={max}."
            )));
        }
        match steps {
            0 => Err(ScanError::config("Distance modulus steps must be >= 1.")),
            1 => Ok(vec![min]),
            _ => {
                let step = (max - min) / (steps as f64 - 1.0);
                Ok((0..steps).map(|i| min + step * i as f64).collect())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.distance_modulus_array.is_empty() {
            return Err(ScanError::config("distance_modulus_array must not be empty."));
        }
        if let Some(bad) = self.distance_modulus_array.iter().find(|v| !v.is_finite()) {
            return Err(ScanError::config(format!(
                "distance_modulus_array contains a non-finite value ({bad})."
            )));
        }
        if self.nside_likelihood == 0 || self.nside_pixel == 0 {
            return Err(ScanError::config("nside values must be > 0."));
        }

        let iv = &self.intervals;
        if !(iv.ts_threshold.is_finite() && iv.ts_threshold > 0.0) {
            return Err(ScanError::config("ts_threshold must be finite and > 0."));
        }
        for (name, level) in [
            ("richness_confidence", iv.richness_confidence),
            ("modulus_confidence", iv.modulus_confidence),
            ("upper_limit_confidence", iv.upper_limit_confidence),
        ] {
            if !(level > 0.0 && level < 1.0) {
                return Err(ScanError::config(format!("{name} must lie in (0, 1), got {level}.")));
            }
        }
        Ok(())
    }
}

/// Ordered target pixels of the region, with parallel coordinate arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPixels {
    pub pix: Vec<u64>,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

impl TargetPixels {
    pub fn new(pix: Vec<u64>, lon: Vec<f64>, lat: Vec<f64>) -> Result<Self, ScanError> {
        if pix.len() != lon.len() || pix.len() != lat.len() {
            return Err(ScanError::config(format!(
                "Target pixel arrays differ in length (pix={}, lon={}, lat={}).",
                pix.len(),
                lon.len(),
                lat.len()
            )));
        }
        Ok(Self { pix, lon, lat })
    }

    pub fn len(&self) -> usize {
        self.pix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pix.is_empty()
    }

    /// Index of the target pixel closest (great-circle) to `(lon, lat)` in degrees.
    ///
    /// Returns `None` for an empty sequence.
    pub fn nearest_index(&self, lon: f64, lat: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (j, (&plon, &plat)) in self.lon.iter().zip(self.lat.iter()).enumerate() {
            let d = angular_separation(lon, lat, plon, plat);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((j, d));
            }
        }
        best.map(|(j, _)| j)
    }
}

/// Great-circle separation in degrees (haversine).
pub fn angular_separation(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin().to_degrees()
}

/// Partial update of the engine's pending parameters.
///
/// `None` fields are left untouched. Applying an update never synchronizes the
/// engine; that is a separate (expensive) step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamUpdate {
    pub distance_modulus: Option<f64>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

impl ParamUpdate {
    pub fn distance_modulus(distance_modulus: f64) -> Self {
        Self {
            distance_modulus: Some(distance_modulus),
            ..Self::default()
        }
    }

    pub fn position(lon: f64, lat: f64) -> Self {
        Self {
            lon: Some(lon),
            lat: Some(lat),
            ..Self::default()
        }
    }

    pub fn all(distance_modulus: f64, lon: f64, lat: f64) -> Self {
        Self {
            distance_modulus: Some(distance_modulus),
            lon: Some(lon),
            lat: Some(lat),
        }
    }
}

/// Fitted morphology of the current source model (when the model has one).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShapeParams {
    pub extension: Option<f64>,
    pub ellipticity: Option<f64>,
    pub position_angle: Option<f64>,
}

/// Catalog photometry consumed by the color lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Photometry {
    pub mag_1: Vec<f64>,
    pub mag_2: Vec<f64>,
    pub mag_err_1: Vec<f64>,
    pub mag_err_2: Vec<f64>,
}

impl Photometry {
    pub fn len(&self) -> usize {
        self.mag_1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mag_1.is_empty()
    }
}

/// Maximum-likelihood point estimate read off the search grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MleRecord {
    pub richness: f64,
    pub lon: f64,
    pub lat: f64,
    pub distance_modulus: f64,
    pub extension: f64,
    pub ellipticity: f64,
    pub position_angle: f64,
    pub age: f64,
    pub metallicity: f64,
}

impl MleRecord {
    /// `(name, value)` pairs in canonical order.
    pub fn fields(&self) -> [(&'static str, f64); 9] {
        [
            ("richness", self.richness),
            ("lon", self.lon),
            ("lat", self.lat),
            ("distance_modulus", self.distance_modulus),
            ("extension", self.extension),
            ("ellipticity", self.ellipticity),
            ("position_angle", self.position_angle),
            ("age", self.age),
            ("metallicity", self.metallicity),
        ]
    }
}

/// Two-element `[lo, hi]` interval; `[NaN, NaN]` when unavailable.
pub type Interval = [f64; 2];

pub const NAN_INTERVAL: Interval = [f64::NAN, f64::NAN];

/// Rough uncertainty estimate around the MLE.
///
/// Every interval defaults to `[NaN, NaN]`; callers must check before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrRecord {
    pub mle: MleRecord,
    pub richness: Interval,
    pub lon: Interval,
    pub lat: Interval,
    pub distance_modulus: Interval,
    pub extension: Interval,
    pub ellipticity: Interval,
    pub position_angle: Interval,
    pub age: Interval,
    pub metallicity: Interval,
}

impl ErrRecord {
    pub fn unknown(mle: MleRecord) -> Self {
        Self {
            mle,
            richness: NAN_INTERVAL,
            lon: NAN_INTERVAL,
            lat: NAN_INTERVAL,
            distance_modulus: NAN_INTERVAL,
            extension: NAN_INTERVAL,
            ellipticity: NAN_INTERVAL,
            position_angle: NAN_INTERVAL,
            age: NAN_INTERVAL,
            metallicity: NAN_INTERVAL,
        }
    }

    /// `(name, interval)` pairs in the same order as [`MleRecord::fields`].
    pub fn intervals(&self) -> [(&'static str, Interval); 9] {
        [
            ("richness", self.richness),
            ("lon", self.lon),
            ("lat", self.lat),
            ("distance_modulus", self.distance_modulus),
            ("extension", self.extension),
            ("ellipticity", self.ellipticity),
            ("position_angle", self.position_angle),
            ("age", self.age),
            ("metallicity", self.metallicity),
        ]
    }
}
