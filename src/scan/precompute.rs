//! Per-modulus precompute of signal color and observable fraction.
//!
//! The sweep can recompute both quantities cell by cell; caching them once per
//! distance modulus trades memory for a much cheaper inner loop.

use log::info;

use crate::engine::LikelihoodEngine;
use crate::error::ScanError;
use crate::io::ColorLut;

/// Where a cached signal-color table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalColorSource {
    Lookup,
    OnTheFly,
}

/// Cached tables, indexed by distance-modulus index.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputeCache {
    distance_modulus: Vec<f64>,
    signal_color: Vec<Vec<f64>>,
    observable_fraction: Vec<Vec<f64>>,
    sources: Vec<SignalColorSource>,
}

impl PrecomputeCache {
    pub fn distance_modulus(&self) -> &[f64] {
        &self.distance_modulus
    }

    pub fn len(&self) -> usize {
        self.distance_modulus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance_modulus.is_empty()
    }

    /// `(signal_color, observable_fraction)` for modulus index `i`.
    pub fn row(&self, i: usize) -> Option<(&[f64], &[f64])> {
        Some((self.signal_color.get(i)?, self.observable_fraction.get(i)?))
    }

    pub fn source(&self, i: usize) -> Option<SignalColorSource> {
        self.sources.get(i).copied()
    }
}

/// Precompute both tables for every modulus, in order.
///
/// The lookup table wins when it covers the modulus with a non-zero result;
/// otherwise the signal color is computed by the engine.
pub fn precompute<E: LikelihoodEngine>(
    engine: &E,
    distance_modulus: &[f64],
    lut: Option<&ColorLut>,
) -> Result<PrecomputeCache, ScanError> {
    let n = distance_modulus.len();
    let mut signal_color = Vec::with_capacity(n);
    let mut observable_fraction = Vec::with_capacity(n);
    let mut sources = Vec::with_capacity(n);

    info!("Looping over distance moduli in precompute ...");
    for (ii, &dm) in distance_modulus.iter().enumerate() {
        info!("  ({}/{n}) Distance Modulus = {dm:.2} ...", ii + 1);

        let from_lut = lut
            .and_then(|lut| lut.signal_color(dm, engine.photometry()))
            .filter(|u| u.iter().any(|&v| v != 0.0));
        let (u_color, source) = match from_lut {
            Some(u) => {
                info!("  Precomputed signal color from lookup table");
                (u, SignalColorSource::Lookup)
            }
            None => {
                info!("  Precomputing signal color on the fly...");
                (engine.calc_signal_color(dm)?, SignalColorSource::OnTheFly)
            }
        };

        signal_color.push(u_color);
        sources.push(source);
        observable_fraction.push(engine.calc_observable_fraction(dm)?);
    }

    Ok(PrecomputeCache {
        distance_modulus: distance_modulus.to_vec(),
        signal_color,
        observable_fraction,
        sources,
    })
}
