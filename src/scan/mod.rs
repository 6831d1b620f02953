//! Grid-search orchestration.
//!
//! Responsibilities:
//!
//! - sweep (distance modulus x target pixel), one richness fit per cell
//! - optional per-modulus precompute of signal color / observable fraction
//! - point estimate (MLE) and rough intervals around it
//! - shape the `[M, P]` arrays into a pixel-major sparse map

pub mod arrays;
pub mod grid;
pub mod interval;
pub mod output;
pub mod precompute;

pub use arrays::*;
pub use grid::*;
pub use interval::*;
pub use output::*;
pub use precompute::*;
