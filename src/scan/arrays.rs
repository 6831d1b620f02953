//! Result surfaces of one sweep.
//!
//! Seven `[M, P]` arrays, zero-initialized at sweep start. A zero cell can mean
//! "not visited" or "visited, fitted zero"; the parallel `visited` mask tells
//! the two apart without changing the zero default downstream readers see.

use ndarray::Array2;

/// One of the seven per-cell result fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    LogLikelihood,
    Richness,
    RichnessLower,
    RichnessUpper,
    RichnessLimit,
    StellarMass,
    FractionObservable,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::LogLikelihood,
        Field::Richness,
        Field::RichnessLower,
        Field::RichnessUpper,
        Field::RichnessLimit,
        Field::StellarMass,
        Field::FractionObservable,
    ];

    /// Fields that are always populated, even without `full_pdf`.
    pub const REDUCED: [Field; 3] = [
        Field::LogLikelihood,
        Field::Richness,
        Field::FractionObservable,
    ];

    /// Column name in the persisted sparse map.
    pub fn key(self) -> &'static str {
        match self {
            Field::LogLikelihood => "LOG_LIKELIHOOD",
            Field::Richness => "RICHNESS",
            Field::RichnessLower => "RICHNESS_LOWER",
            Field::RichnessUpper => "RICHNESS_UPPER",
            Field::RichnessLimit => "RICHNESS_LIMIT",
            Field::StellarMass => "STELLAR_MASS",
            Field::FractionObservable => "FRACTION_OBSERVABLE",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Everything recorded for one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellResult {
    pub log_likelihood: f64,
    pub richness: f64,
    pub richness_lower: f64,
    pub richness_upper: f64,
    pub richness_limit: f64,
    pub stellar_mass: f64,
    pub fraction_observable: f64,
}

impl CellResult {
    /// Test statistic `2 x logL`.
    pub fn ts(&self) -> f64 {
        2.0 * self.log_likelihood
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseArrays {
    log_likelihood: Array2<f64>,
    richness: Array2<f64>,
    richness_lower: Array2<f64>,
    richness_upper: Array2<f64>,
    richness_limit: Array2<f64>,
    stellar_mass: Array2<f64>,
    fraction_observable: Array2<f64>,
    visited: Array2<bool>,
}

impl SparseArrays {
    pub fn zeros(n_moduli: usize, n_pixels: usize) -> Self {
        let shape = (n_moduli, n_pixels);
        Self {
            log_likelihood: Array2::zeros(shape),
            richness: Array2::zeros(shape),
            richness_lower: Array2::zeros(shape),
            richness_upper: Array2::zeros(shape),
            richness_limit: Array2::zeros(shape),
            stellar_mass: Array2::zeros(shape),
            fraction_observable: Array2::zeros(shape),
            visited: Array2::from_elem(shape, false),
        }
    }

    /// `(M, P)`.
    pub fn shape(&self) -> (usize, usize) {
        self.log_likelihood.dim()
    }

    pub fn get(&self, field: Field) -> &Array2<f64> {
        match field {
            Field::LogLikelihood => &self.log_likelihood,
            Field::Richness => &self.richness,
            Field::RichnessLower => &self.richness_lower,
            Field::RichnessUpper => &self.richness_upper,
            Field::RichnessLimit => &self.richness_limit,
            Field::StellarMass => &self.stellar_mass,
            Field::FractionObservable => &self.fraction_observable,
        }
    }

    pub fn log_likelihood(&self) -> &Array2<f64> {
        &self.log_likelihood
    }

    pub fn richness(&self) -> &Array2<f64> {
        &self.richness
    }

    pub fn visited(&self) -> &Array2<bool> {
        &self.visited
    }

    pub fn n_visited(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }

    pub fn store(&mut self, i: usize, j: usize, cell: &CellResult) {
        self.log_likelihood[[i, j]] = cell.log_likelihood;
        self.richness[[i, j]] = cell.richness;
        self.richness_lower[[i, j]] = cell.richness_lower;
        self.richness_upper[[i, j]] = cell.richness_upper;
        self.richness_limit[[i, j]] = cell.richness_limit;
        self.stellar_mass[[i, j]] = cell.stellar_mass;
        self.fraction_observable[[i, j]] = cell.fraction_observable;
        self.visited[[i, j]] = true;
    }

    pub fn cell(&self, i: usize, j: usize) -> CellResult {
        CellResult {
            log_likelihood: self.log_likelihood[[i, j]],
            richness: self.richness[[i, j]],
            richness_lower: self.richness_lower[[i, j]],
            richness_upper: self.richness_upper[[i, j]],
            richness_limit: self.richness_limit[[i, j]],
            stellar_mass: self.stellar_mass[[i, j]],
            fraction_observable: self.fraction_observable[[i, j]],
        }
    }

    /// Visited cell with the largest log-likelihood.
    ///
    /// Scan order is modulus-major (row-major), and ties keep the first cell.
    /// NaN likelihoods never win.
    pub fn argmax_visited(&self) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), f64)> = None;
        for ((i, j), &v) in self.log_likelihood.indexed_iter() {
            if !self.visited[[i, j]] || v.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, bv)| v > bv) {
                best = Some(((i, j), v));
            }
        }
        best.map(|(idx, _)| idx)
    }
}
