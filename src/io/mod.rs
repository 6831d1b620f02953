//! Input/output helpers.
//!
//! - scan configuration JSON (`config`)
//! - precomputed signal-color lookup tables (`color_lut`)
//! - sparse sky-map write/read (`sparse_map`)

pub mod color_lut;
pub mod config;
pub mod sparse_map;

pub use color_lut::*;
pub use config::*;
pub use sparse_map::*;
