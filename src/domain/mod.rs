//! Domain types used throughout the scan.
//!
//! This module defines:
//!
//! - run configuration (`ScanConfig`, `IntervalConfig`)
//! - the target-pixel sequence and engine parameter updates
//! - summary records (`MleRecord`, `ErrRecord`)

pub mod types;

pub use types::*;
