//! Precomputed signal-color lookup tables.
//!
//! A table per distance modulus holds, for every pair of magnitude-error bins,
//! a 2-D histogram of signal-color probability over `(mag_2, mag_1)` bins.
//! Stars are looked up by digitizing their photometry; magnitudes outside the
//! histogram range get probability 0.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::domain::Photometry;
use crate::error::ScanError;

/// Maximum distance between a requested modulus and a tabulated one.
pub const MODULUS_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLut {
    pub distance_modulus: Vec<f64>,
    pub bins_mag_err: Vec<f64>,
    pub bins_mag_1: Vec<f64>,
    pub bins_mag_2: Vec<f64>,
    /// Modulus key (`"%.2f"`) -> error-bin key (`"i,j"`) -> `[mag_2 bin][mag_1 bin]`.
    pub tables: BTreeMap<String, BTreeMap<String, Vec<Vec<f64>>>>,
}

impl ColorLut {
    pub fn modulus_key(distance_modulus: f64) -> String {
        format!("{distance_modulus:.2}")
    }

    pub fn error_key(index_err_1: usize, index_err_2: usize) -> String {
        format!("{index_err_1},{index_err_2}")
    }

    /// Per-star signal-color probability at `distance_modulus`.
    ///
    /// `None` when the modulus is not tabulated (within [`MODULUS_TOLERANCE`])
    /// or the photometry arrays are inconsistent.
    pub fn signal_color(&self, distance_modulus: f64, photometry: &Photometry) -> Option<Vec<f64>> {
        let nearest = self
            .distance_modulus
            .iter()
            .copied()
            .min_by(|a, b| (a - distance_modulus).abs().total_cmp(&(b - distance_modulus).abs()))
            .filter(|dm| (dm - distance_modulus).abs() < MODULUS_TOLERANCE);
        let Some(nearest) = nearest else {
            warn!(
                "Distance modulus {distance_modulus:.2} not available in color LUT (available: {:?})",
                self.distance_modulus
            );
            return None;
        };

        let Some(tables) = self.tables.get(&Self::modulus_key(nearest)) else {
            warn!("Color LUT has no table for distance modulus {nearest:.2}");
            return None;
        };

        let n = photometry.len();
        if photometry.mag_2.len() != n || photometry.mag_err_1.len() != n || photometry.mag_err_2.len() != n {
            warn!("Catalog photometry arrays differ in length; skipping color LUT");
            return None;
        }
        if self.bins_mag_err.len() < 2 {
            warn!("Color LUT has fewer than two magnitude-error bin edges");
            return None;
        }

        let max_err_bin = self.bins_mag_err.len() - 2;
        let clip_err = |err: f64| digitize(err, &self.bins_mag_err).saturating_sub(1).min(max_err_bin);

        let u_color = (0..n)
            .map(|k| {
                let key = Self::error_key(clip_err(photometry.mag_err_1[k]), clip_err(photometry.mag_err_2[k]));
                tables.get(&key).map_or(0.0, |histo| {
                    take_2d(
                        histo,
                        photometry.mag_2[k],
                        photometry.mag_1[k],
                        &self.bins_mag_2,
                        &self.bins_mag_1,
                    )
                })
            })
            .collect();
        Some(u_color)
    }
}

/// Number of bin edges `<= x` (bins ascending).
fn digitize(x: f64, bins: &[f64]) -> usize {
    bins.partition_point(|&b| b <= x)
}

/// Histogram value at `(x, y)`, 0 outside the bin edges.
fn take_2d(histo: &[Vec<f64>], x: f64, y: f64, bins_x: &[f64], bins_y: &[f64]) -> f64 {
    let ix = digitize(x, bins_x);
    let iy = digitize(y, bins_y);
    if ix == 0 || ix >= bins_x.len() || iy == 0 || iy >= bins_y.len() {
        return 0.0;
    }
    histo
        .get(ix - 1)
        .and_then(|row| row.get(iy - 1))
        .copied()
        .unwrap_or(0.0)
}

pub fn read_color_lut(path: &Path) -> Result<ColorLut, ScanError> {
    let file = File::open(path)
        .map_err(|e| ScanError::io(format!("Failed to open color LUT '{}'", path.display()), e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ScanError::format(format!("Invalid color LUT JSON '{}'", path.display()), e))
}

pub fn write_color_lut(path: &Path, lut: &ColorLut) -> Result<(), ScanError> {
    let file = File::create(path)
        .map_err(|e| ScanError::io(format!("Failed to create color LUT '{}'", path.display()), e))?;
    serde_json::to_writer(file, lut).map_err(|e| ScanError::format("Failed to write color LUT JSON", e))
}

#[cfg(test)]
pub(crate) fn sample_lut() -> ColorLut {
    // Two error bins, 2x2 magnitude bins, one modulus.
    let mut per_err = BTreeMap::new();
    per_err.insert(ColorLut::error_key(0, 0), vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    per_err.insert(ColorLut::error_key(1, 1), vec![vec![0.5, 0.6], vec![0.7, 0.8]]);
    let mut tables = BTreeMap::new();
    tables.insert(ColorLut::modulus_key(18.0), per_err);
    ColorLut {
        distance_modulus: vec![18.0],
        bins_mag_err: vec![0.0, 0.05, 0.1],
        bins_mag_1: vec![20.0, 21.0, 22.0],
        bins_mag_2: vec![19.0, 20.0, 21.0],
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photometry() -> Photometry {
        Photometry {
            mag_1: vec![20.5, 21.5, 23.0, 21.5],
            mag_2: vec![19.5, 20.5, 20.5, 20.5],
            mag_err_1: vec![0.01, 0.01, 0.01, 0.5],
            mag_err_2: vec![0.01, 0.01, 0.01, 0.07],
        }
    }

    #[test]
    fn looks_up_stars_by_bins() {
        let lut = sample_lut();
        let u = lut.signal_color(18.0, &photometry()).unwrap();
        // star 0: err bins (0,0), mag_2 bin 0, mag_1 bin 0
        assert!((u[0] - 0.1).abs() < 1e-12);
        // star 1: err bins (0,0), mag_2 bin 1, mag_1 bin 1
        assert!((u[1] - 0.4).abs() < 1e-12);
        // star 2: mag_1 beyond the last edge
        assert_eq!(u[2], 0.0);
        // star 3: large errors clip into the last error bin (1,1)
        assert!((u[3] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn untabulated_modulus_is_unavailable() {
        let lut = sample_lut();
        assert!(lut.signal_color(18.5, &photometry()).is_none());
        assert!(lut.signal_color(18.0005, &photometry()).is_some());
    }

    #[test]
    fn lut_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lut.json");
        let lut = sample_lut();
        write_color_lut(&path, &lut).unwrap();
        assert_eq!(read_color_lut(&path).unwrap(), lut);
    }
}
