//! Construction of the external collaborators.
//!
//! Building a region or a likelihood engine needs catalogs, masks and
//! isochrones that live outside this crate. An [`AnalysisBuilder`] hides all of
//! that behind two calls.

use crate::domain::ScanConfig;
use crate::engine::{LikelihoodEngine, RegionGeometry};
use crate::error::ScanError;

/// Center and radius (degrees) of the region to scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCoord {
    pub lon: f64,
    pub lat: f64,
    pub radius: f64,
}

impl TargetCoord {
    pub fn new(lon: f64, lat: f64, radius: f64) -> Self {
        Self { lon, lat, radius }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if !(self.lon.is_finite() && self.lat.is_finite()) || self.lat.abs() > 90.0 {
            return Err(ScanError::config(format!(
                "Invalid target coordinate ({}, {}).",
                self.lon, self.lat
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ScanError::config(format!("Invalid target radius {}.", self.radius)));
        }
        Ok(())
    }
}

pub trait AnalysisBuilder {
    type Region: RegionGeometry;
    type Engine: LikelihoodEngine;

    fn build_region(&self, config: &ScanConfig, target: &TargetCoord) -> Result<Self::Region, ScanError>;

    /// Engine bound to the catalog, mask and source model of `region`.
    fn build_engine(&self, config: &ScanConfig, region: &Self::Region) -> Result<Self::Engine, ScanError>;
}
