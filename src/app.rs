//! Single-target scan workflow.
//!
//! [`Scan`] ties the pieces together:
//! - validate the configuration and the target coordinate
//! - build region and engine through an [`AnalysisBuilder`]
//! - run the grid search, then summarize and write results

use std::path::Path;

use log::info;

use crate::domain::{ErrRecord, MleRecord, ScanConfig};
use crate::error::ScanError;
use crate::io::read_config;
use crate::scan::{GridSearch, Restriction};

pub mod builder;

pub use builder::{AnalysisBuilder, TargetCoord};

/// Point estimate and rough errors of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub mle: MleRecord,
    pub err: ErrRecord,
}

pub struct Scan<B: AnalysisBuilder> {
    target: TargetCoord,
    grid: GridSearch<B::Region, B::Engine>,
}

impl<B: AnalysisBuilder> Scan<B> {
    /// Build a scan around exactly one target coordinate.
    pub fn new(config: ScanConfig, coords: &[TargetCoord], builder: &B) -> Result<Self, ScanError> {
        let [target] = coords else {
            return Err(ScanError::config(format!(
                "Expected exactly one target coordinate, got {}.",
                coords.len()
            )));
        };
        target.validate()?;
        config.validate()?;

        info!(
            "Building region at ({:.4}, {:.4}) with radius {:.2} deg ...",
            target.lon, target.lat, target.radius
        );
        let region = builder.build_region(&config, target)?;
        let engine = builder.build_engine(&config, &region)?;

        Ok(Self {
            target: *target,
            grid: GridSearch::new(config, region, engine)?,
        })
    }

    pub fn from_config_file(path: &Path, coords: &[TargetCoord], builder: &B) -> Result<Self, ScanError> {
        Self::new(read_config(path)?, coords, builder)
    }

    pub fn target(&self) -> &TargetCoord {
        &self.target
    }

    pub fn grid(&self) -> &GridSearch<B::Region, B::Engine> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridSearch<B::Region, B::Engine> {
        &mut self.grid
    }

    /// Run the sweep (precomputing first when a color lookup table is configured).
    pub fn run(&mut self, restriction: Restriction) -> Result<&GridSearch<B::Region, B::Engine>, ScanError> {
        if self.grid.config().color_lut_infile.is_some() {
            self.grid.precompute(None)?;
        }
        self.grid.search(restriction)?;
        Ok(&self.grid)
    }

    /// MLE and rough errors of the last sweep.
    pub fn summarize(&mut self) -> Result<ScanSummary, ScanError> {
        let mle = self.grid.mle()?;
        let err = self.grid.err()?;
        Ok(ScanSummary { mle, err })
    }

    pub fn write(&self, path: &Path) -> Result<(), ScanError> {
        info!("Writing {} ...", path.display());
        self.grid.write_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{read_sparse_map, write_config, write_color_lut};
    use crate::io::color_lut::sample_lut;
    use crate::testing::{MockEngine, MockRegion, pixel_lon};

    struct MockBuilder {
        n_pixels: usize,
    }

    impl AnalysisBuilder for MockBuilder {
        type Region = MockRegion;
        type Engine = MockEngine;

        fn build_region(&self, _config: &ScanConfig, _target: &TargetCoord) -> Result<MockRegion, ScanError> {
            Ok(MockRegion::new(self.n_pixels))
        }

        fn build_engine(&self, config: &ScanConfig, region: &MockRegion) -> Result<MockEngine, ScanError> {
            use crate::engine::RegionGeometry;
            let n = region.target_pixels().len();
            Ok(MockEngine::surface(config.distance_modulus_array.clone(), n, |i, j| {
                if j == 1 { 5.0 + i as f64 } else { 0.5 }
            }))
        }
    }

    fn target() -> TargetCoord {
        TargetCoord::new(30.0, -10.0, 0.5)
    }

    #[test]
    fn requires_exactly_one_coordinate() {
        let builder = MockBuilder { n_pixels: 3 };
        let config = ScanConfig::with_moduli(vec![18.0]);

        for coords in [vec![], vec![target(), target()]] {
            let err = Scan::new(config.clone(), &coords, &builder).err().unwrap();
            assert!(matches!(err, ScanError::Config(_)));
        }
        assert!(Scan::new(config, &[target()], &builder).is_ok());
    }

    #[test]
    fn rejects_malformed_coordinate_before_building() {
        let builder = MockBuilder { n_pixels: 3 };
        let config = ScanConfig::with_moduli(vec![18.0]);
        let bad = TargetCoord::new(f64::NAN, 0.0, 0.5);
        assert!(matches!(Scan::new(config, &[bad], &builder), Err(ScanError::Config(_))));
    }

    #[test]
    fn run_summarize_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let builder = MockBuilder { n_pixels: 3 };
        let mut scan = Scan::new(ScanConfig::with_moduli(vec![17.0, 18.0]), &[target()], &builder).unwrap();

        scan.run(Restriction::full()).unwrap();
        let summary = scan.summarize().unwrap();
        assert_eq!(summary.mle.distance_modulus, 18.0);
        assert_eq!(summary.mle.lon, pixel_lon(1));
        assert_eq!(summary.err.mle, summary.mle);

        let path = dir.path().join("likelihood.json");
        scan.write(&path).unwrap();
        let map = read_sparse_map(&path).unwrap();
        assert_eq!(map.value("LOG_LIKELIHOOD", 1, 1), Some(6.0));
    }

    #[test]
    fn configured_lookup_table_triggers_precompute() {
        let dir = tempfile::tempdir().unwrap();
        let lut_path = dir.path().join("lut.json");
        write_color_lut(&lut_path, &sample_lut()).unwrap();

        let mut config = ScanConfig::with_moduli(vec![18.0]);
        config.color_lut_infile = Some(lut_path);
        let config_path = dir.path().join("scan.json");
        write_config(&config_path, &config).unwrap();

        let builder = MockBuilder { n_pixels: 2 };
        let mut scan = Scan::from_config_file(&config_path, &[target()], &builder).unwrap();
        scan.run(Restriction::full()).unwrap();
        assert_eq!(scan.grid().cache().map(|c| c.len()), Some(1));
        assert_eq!(scan.grid().engine().precomputed_rows, 1);
    }
}
