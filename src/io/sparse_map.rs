//! Sparse sky-map files.
//!
//! A sparse map stores values only at the listed target pixels. Each field is
//! pixel-major: a flat vector when there is a single distance modulus,
//! otherwise one row of per-modulus values per pixel. NaN is stored as JSON
//! `null`; infinities as the strings `"inf"` / `"-inf"`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub enum FieldData {
    /// One value per pixel (single distance modulus).
    Flat(Vec<f64>),
    /// `[pixel][modulus]`.
    Stacked(Vec<Vec<f64>>),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawField {
    Flat(Vec<Option<RawValue>>),
    Stacked(Vec<Vec<Option<RawValue>>>),
}

/// JSON numbers cannot hold infinities.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Special(String),
}

fn to_raw(v: f64) -> Option<RawValue> {
    if v.is_nan() {
        None
    } else if v.is_infinite() {
        Some(RawValue::Special(if v > 0.0 { "inf" } else { "-inf" }.to_string()))
    } else {
        Some(RawValue::Number(v))
    }
}

fn from_raw(v: Option<RawValue>) -> f64 {
    match v {
        None => f64::NAN,
        Some(RawValue::Number(v)) => v,
        Some(RawValue::Special(s)) => s.parse().unwrap_or(f64::NAN),
    }
}

impl From<RawField> for FieldData {
    fn from(raw: RawField) -> Self {
        match raw {
            RawField::Flat(v) => FieldData::Flat(v.into_iter().map(from_raw).collect()),
            RawField::Stacked(rows) => FieldData::Stacked(
                rows.into_iter()
                    .map(|row| row.into_iter().map(from_raw).collect())
                    .collect(),
            ),
        }
    }
}

impl From<FieldData> for RawField {
    fn from(field: FieldData) -> Self {
        match field {
            FieldData::Flat(v) => RawField::Flat(v.into_iter().map(to_raw).collect()),
            FieldData::Stacked(rows) => RawField::Stacked(
                rows.into_iter()
                    .map(|row| row.into_iter().map(to_raw).collect())
                    .collect(),
            ),
        }
    }
}

impl FieldData {
    pub fn n_pixels(&self) -> usize {
        match self {
            FieldData::Flat(v) => v.len(),
            FieldData::Stacked(rows) => rows.len(),
        }
    }
}

/// Scalar header value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
}

impl HeaderValue {
    pub fn as_f64(self) -> f64 {
        match self {
            HeaderValue::Int(v) => v as f64,
            HeaderValue::Float(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMapFile {
    /// Target pixel indices, in result order.
    pub pixels: Vec<u64>,
    pub nside: u32,
    /// Auxiliary axis label for stacked fields.
    pub distance_modulus: Vec<f64>,
    pub fields: BTreeMap<String, FieldData>,
    pub header: BTreeMap<String, HeaderValue>,
}

impl SparseMapFile {
    /// Value of `field` at `(pixel_idx, modulus_idx)`.
    ///
    /// Flat fields only answer `modulus_idx == 0`.
    pub fn value(&self, field: &str, pixel_idx: usize, modulus_idx: usize) -> Option<f64> {
        match self.fields.get(field)? {
            FieldData::Flat(v) if modulus_idx == 0 => v.get(pixel_idx).copied(),
            FieldData::Flat(_) => None,
            FieldData::Stacked(rows) => rows.get(pixel_idx)?.get(modulus_idx).copied(),
        }
    }

    pub fn header_value(&self, key: &str) -> Option<f64> {
        self.header.get(key).map(|v| v.as_f64())
    }
}

/// Destination for sparse maps.
pub trait SparseMapWriter {
    fn write_sparse_map(&self, map: &SparseMapFile) -> Result<(), ScanError>;
}

/// Writes sparse maps as JSON documents.
#[derive(Debug, Clone)]
pub struct JsonSparseMapWriter {
    path: PathBuf,
}

impl JsonSparseMapWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SparseMapWriter for JsonSparseMapWriter {
    fn write_sparse_map(&self, map: &SparseMapFile) -> Result<(), ScanError> {
        let file = File::create(&self.path)
            .map_err(|e| ScanError::io(format!("Failed to create sparse map '{}'", self.path.display()), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, map).map_err(|e| ScanError::format("Failed to write sparse map JSON", e))?;
        writer
            .flush()
            .map_err(|e| ScanError::io(format!("Failed to flush sparse map '{}'", self.path.display()), e))
    }
}

pub fn read_sparse_map(path: &Path) -> Result<SparseMapFile, ScanError> {
    let file = File::open(path)
        .map_err(|e| ScanError::io(format!("Failed to open sparse map '{}'", path.display()), e))?;
    let map: SparseMapFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ScanError::format(format!("Invalid sparse map JSON '{}'", path.display()), e))?;

    for (name, field) in &map.fields {
        if field.n_pixels() != map.pixels.len() {
            return Err(ScanError::config(format!(
                "Sparse map field {name} has {} pixels, expected {}.",
                field.n_pixels(),
                map.pixels.len()
            )));
        }
    }
    Ok(map)
}
