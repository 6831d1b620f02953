//! Collaborator interfaces.
//!
//! The scan drives, but does not implement:
//!
//! - the likelihood engine (per-cell richness fit)
//! - the region geometry (target pixels and membership predicates)
//! - the profile-likelihood queries returned by each fit
//!
//! `math::Parabola` is the in-crate [`ProfileLikelihood`] implementation.

pub mod likelihood;
pub mod profile;
pub mod region;

pub use likelihood::*;
pub use profile::*;
pub use region::*;
