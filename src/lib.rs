//! `satscan` library crate.
//!
//! Maximum-likelihood grid search for faint, spatially extended stellar
//! systems. The crate owns the sweep over (distance modulus x target pixel),
//! the summary statistics derived from it, and the sparse sky-map output.
//!
//! The likelihood engine and the region geometry are supplied by the caller
//! through the traits in [`engine`]; this crate never computes a likelihood
//! itself.

pub mod app;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod scan;

#[cfg(test)]
pub(crate) mod testing;
