//! Region-of-interest geometry consumed by the scan.

use crate::domain::TargetPixels;

/// Geometry of the region being scanned.
///
/// Implementations own the pixelization; the scan only reads the ordered
/// target pixels and asks membership questions about catalog objects.
pub trait RegionGeometry {
    /// Ordered target pixels. Fixed for the lifetime of a scan.
    fn target_pixels(&self) -> &TargetPixels;

    /// Index of the target pixel nearest to `(lon, lat)`.
    ///
    /// The default is a brute-force great-circle search; pixelized regions
    /// will usually answer this directly.
    fn index_target(&self, lon: f64, lat: f64) -> usize {
        self.target_pixels().nearest_index(lon, lat).unwrap_or(0)
    }

    fn in_roi(&self, lon: &[f64], lat: &[f64]) -> Vec<bool>;
    fn in_annulus(&self, lon: &[f64], lat: &[f64]) -> Vec<bool>;
    fn in_interior(&self, lon: &[f64], lat: &[f64]) -> Vec<bool>;
    fn in_target(&self, lon: &[f64], lat: &[f64]) -> Vec<bool>;

    /// Pixel index (at resolution `nside`) containing the region center.
    fn likelihood_pixel(&self, nside: u32) -> u64;
}

/// Number of `true` entries in a membership mask.
pub fn count_members(mask: &[bool]) -> usize {
    mask.iter().filter(|&&inside| inside).count()
}
