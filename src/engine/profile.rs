/// Queries over a profile likelihood built from `(x, 2 x logL)` samples.
pub trait ProfileLikelihood {
    /// `(lo, hi)` bounding the likelihood region holding `level` of the mass.
    fn confidence_interval(&self, level: f64) -> (f64, f64);

    /// One-sided upper bound at `level` under a flat prior on `x >= 0`.
    fn bayesian_upper_limit(&self, level: f64) -> f64;

    /// The `x` where the curve has dropped by `delta` from its peak.
    fn profile_upper_limit(&self, delta: f64) -> f64;
}
