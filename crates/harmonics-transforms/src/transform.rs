//! The seam between grid-space layers and spectral kernels.

use candle_core::Tensor;
use harmonics_core::Result;

/// A truncated spectral transform over the last two tensor axes.
///
/// Forward transforms map real signals of shape `(..., nlat, nlon)` to
/// truncated complex coefficients `(..., lmax, mmax, 2)`; inverse transforms
/// map the other way. Both directions are modeled as one `forward` callable,
/// so a transform pair is two objects, each carrying its own grid resolution.
/// The spectral convolution layers are written against this trait and do not
/// care whether the backing transform is a true spherical-harmonic transform
/// or the periodic Fourier substitute.
pub trait SpectralTransform: Send + Sync {
    /// Number of latitude points on this transform's physical grid.
    fn nlat(&self) -> usize;
    /// Number of longitude points on this transform's physical grid.
    fn nlon(&self) -> usize;
    /// Latitudinal mode count of the truncated coefficient space.
    fn lmax(&self) -> usize;
    /// Longitudinal mode count of the truncated coefficient space.
    fn mmax(&self) -> usize;

    /// Apply the transform over the last two axes of `x`.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;
}
