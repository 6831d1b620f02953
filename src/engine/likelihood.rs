//! Likelihood engine contract.
//!
//! The engine carries mutable "current parameter" state: `set_params` stages
//! changes, `sync_params` commits them (expensive), and every read after that
//! reflects the committed cell. A single engine value must never be shared by
//! concurrently evaluated cells; parallel sweeps clone one engine per modulus.

use crate::domain::{ParamUpdate, Photometry, ShapeParams};
use crate::engine::ProfileLikelihood;
use crate::error::ScanError;

/// Output of one richness fit.
#[derive(Debug, Clone)]
pub struct RichnessFit<P> {
    pub log_likelihood: f64,
    pub richness: f64,
    pub profile: P,
}

pub trait LikelihoodEngine {
    type Profile: ProfileLikelihood;

    /// Stage a partial parameter update. Does not synchronize.
    fn set_params(&mut self, update: ParamUpdate);

    /// Commit staged parameter changes.
    fn sync_params(&mut self) -> Result<(), ScanError>;

    /// Fit the source richness at the committed parameters.
    fn fit_richness(&mut self) -> Result<RichnessFit<Self::Profile>, ScanError>;

    /// Profile-likelihood richness interval around the current fit.
    fn richness_interval(&mut self, confidence: f64) -> Result<(f64, f64), ScanError>;

    /// Per-star signal-color probability at `distance_modulus`.
    fn calc_signal_color(&self, distance_modulus: f64) -> Result<Vec<f64>, ScanError>;

    /// Observable fraction per region pixel at `distance_modulus`.
    fn calc_observable_fraction(&self, distance_modulus: f64) -> Result<Vec<f64>, ScanError>;

    /// Richness to stellar-mass conversion factor.
    fn stellar_mass(&self) -> f64;

    fn lon(&self) -> f64;
    fn lat(&self) -> f64;

    /// Observable fraction at the committed parameters.
    fn observable_fraction(&self) -> f64;

    /// Catalog object coordinates `(lon, lat)`.
    fn catalog_coords(&self) -> (&[f64], &[f64]);

    fn photometry(&self) -> &Photometry;

    /// Fitted morphology; all `None` for models without one.
    fn shape(&self) -> ShapeParams {
        ShapeParams::default()
    }

    /// Isochrone ages, when the source model carries an age axis.
    fn ages(&self) -> Option<&[f64]> {
        None
    }

    /// Isochrone metallicities, when the source model carries one.
    fn metallicities(&self) -> Option<&[f64]> {
        None
    }

    /// Hand precomputed per-modulus tables to the engine before a row is swept.
    ///
    /// Engines that cannot reuse them ignore the call and recompute per cell.
    fn use_precomputed(&mut self, signal_color: &[f64], observable_fraction: &[f64]) {
        let _ = (signal_color, observable_fraction);
    }

    /// Move to `(distance_modulus, lon, lat)`, synchronize and fit.
    fn evaluate(
        &mut self,
        distance_modulus: f64,
        lon: f64,
        lat: f64,
    ) -> Result<RichnessFit<Self::Profile>, ScanError> {
        self.set_params(ParamUpdate::all(distance_modulus, lon, lat));
        self.sync_params()?;
        self.fit_richness()
    }
}

/// Mean of an optional parameter axis, NaN when absent or empty.
pub fn mean_or_nan(values: Option<&[f64]>) -> f64 {
    match values {
        Some(v) if !v.is_empty() => v.iter().sum::<f64>() / v.len() as f64,
        _ => f64::NAN,
    }
}
