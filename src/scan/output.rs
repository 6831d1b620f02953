//! Shaping sweep results into a sparse sky map.

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::domain::ScanConfig;
use crate::engine::{LikelihoodEngine, RegionGeometry, count_members};
use crate::io::{FieldData, HeaderValue, SparseMapFile};
use crate::scan::{Field, SparseArrays};

/// Fields persisted for a given `full_pdf` setting.
pub fn selected_fields(full_pdf: bool) -> &'static [Field] {
    if full_pdf { &Field::ALL } else { &Field::REDUCED }
}

/// Transpose `[M, P]` to pixel-major; drop the modulus axis when `M == 1`.
pub fn pixel_major(values: &Array2<f64>) -> FieldData {
    if values.nrows() == 1 {
        FieldData::Flat(values.row(0).to_vec())
    } else {
        FieldData::Stacked(values.columns().into_iter().map(|col| col.to_vec()).collect())
    }
}

/// Header metadata: conversion factor, likelihood pixel and membership counts.
pub fn build_header<R, E>(region: &R, engine: &E, config: &ScanConfig, stellar_mass_conversion: f64) -> BTreeMap<String, HeaderValue>
where
    R: RegionGeometry,
    E: LikelihoodEngine,
{
    let (lon, lat) = engine.catalog_coords();
    let count = |mask: Vec<bool>| HeaderValue::Int(count_members(&mask) as i64);
    let stellar = (stellar_mass_conversion * 1e8).round() / 1e8;

    BTreeMap::from([
        ("STELLAR".to_string(), HeaderValue::Float(stellar)),
        ("LKDNSIDE".to_string(), HeaderValue::Int(i64::from(config.nside_likelihood))),
        (
            "LKDPIX".to_string(),
            HeaderValue::Int(region.likelihood_pixel(config.nside_likelihood) as i64),
        ),
        ("NROI".to_string(), count(region.in_roi(lon, lat))),
        ("NANNULUS".to_string(), count(region.in_annulus(lon, lat))),
        ("NINSIDE".to_string(), count(region.in_interior(lon, lat))),
        ("NTARGET".to_string(), count(region.in_target(lon, lat))),
    ])
}

pub fn build_sparse_map<R, E>(
    arrays: &SparseArrays,
    distance_modulus: &[f64],
    region: &R,
    engine: &E,
    config: &ScanConfig,
    stellar_mass_conversion: f64,
) -> SparseMapFile
where
    R: RegionGeometry,
    E: LikelihoodEngine,
{
    let fields = selected_fields(config.full_pdf)
        .iter()
        .map(|&field| (field.key().to_string(), pixel_major(arrays.get(field))))
        .collect();

    SparseMapFile {
        pixels: region.target_pixels().pix.clone(),
        nside: config.nside_pixel,
        distance_modulus: distance_modulus.to_vec(),
        fields,
        header: build_header(region, engine, config, stellar_mass_conversion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_sparse_map;
    use crate::scan::{GridSearch, Restriction};
    use crate::testing::{MockEngine, MockRegion};

    fn searched(moduli: Vec<f64>, n_pixels: usize, full_pdf: bool) -> GridSearch<MockRegion, MockEngine> {
        let engine = MockEngine::surface(moduli.clone(), n_pixels, |i, j| (10 * i + j) as f64);
        let mut config = ScanConfig::with_moduli(moduli);
        config.full_pdf = full_pdf;
        let mut grid = GridSearch::new(config, MockRegion::new(n_pixels), engine).unwrap();
        grid.search(Restriction::full()).unwrap();
        grid
    }

    #[test]
    fn reduced_field_set_without_full_pdf() {
        let map = searched(vec![17.0, 18.0], 3, false).sparse_map();
        let keys: Vec<&str> = map.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["FRACTION_OBSERVABLE", "LOG_LIKELIHOOD", "RICHNESS"]);
    }

    #[test]
    fn full_field_set_with_full_pdf() {
        let map = searched(vec![17.0, 18.0], 3, true).sparse_map();
        assert_eq!(map.fields.len(), 7);
        for field in Field::ALL {
            assert!(map.fields.contains_key(field.key()), "{}", field.key());
        }
    }

    #[test]
    fn stacked_fields_are_pixel_major() {
        let grid = searched(vec![17.0, 18.0, 19.0], 4, false);
        let map = grid.sparse_map();
        assert_eq!(map.pixels, vec![5000, 5001, 5002, 5003]);
        assert_eq!(map.distance_modulus, vec![17.0, 18.0, 19.0]);
        let FieldData::Stacked(rows) = &map.fields["LOG_LIKELIHOOD"] else {
            panic!("expected stacked field");
        };
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec![1.0, 11.0, 21.0]);
    }

    #[test]
    fn single_modulus_collapses_to_flat() {
        let map = searched(vec![18.0], 3, false).sparse_map();
        assert_eq!(map.fields["LOG_LIKELIHOOD"], FieldData::Flat(vec![0.0, 1.0, 2.0]));
    }

    #[test]
    fn header_counts_membership_of_catalog() {
        let grid = searched(vec![18.0], 2, false);
        let header = grid.sparse_map().header;
        assert_eq!(header["STELLAR"], HeaderValue::Float(2.5));
        assert_eq!(header["LKDNSIDE"], HeaderValue::Int(256));
        assert_eq!(header["LKDPIX"], HeaderValue::Int(1256));
        assert_eq!(header["NROI"], HeaderValue::Int(4));
        assert_eq!(header["NANNULUS"], HeaderValue::Int(1));
        assert_eq!(header["NINSIDE"], HeaderValue::Int(2));
        assert_eq!(header["NTARGET"], HeaderValue::Int(1));
    }

    #[test]
    fn stellar_conversion_is_rounded_to_eight_decimals() {
        let grid = searched(vec![18.0], 1, false);
        let header = build_header(grid.region(), grid.engine(), grid.config(), 1.234567891234);
        assert_eq!(header["STELLAR"], HeaderValue::Float(1.23456789));
    }

    #[test]
    fn written_map_reads_back_at_same_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("likelihood.json");

        for (moduli, full_pdf) in [(vec![18.0], false), (vec![17.0, 18.0], true)] {
            let grid = searched(moduli.clone(), 3, full_pdf);
            grid.write_json(&path).unwrap();
            let back = read_sparse_map(&path).unwrap();

            assert_eq!(back.pixels, grid.region().target_pixels().pix);
            for field in selected_fields(full_pdf) {
                for (i, j) in (0..moduli.len()).flat_map(|i| (0..3).map(move |j| (i, j))) {
                    assert_eq!(
                        back.value(field.key(), j, i),
                        Some(grid.arrays().get(*field)[[i, j]]),
                        "{} ({i},{j})",
                        field.key()
                    );
                }
            }
        }
    }
}
