//! Mathematical utilities: small least-squares solves and the parabolic
//! profile-likelihood model.

pub mod ols;
pub mod parabola;

pub use ols::*;
pub use parabola::*;
