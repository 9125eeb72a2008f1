//! Spectral transforms for candle tensors.
//!
//! Wraps rustfft-based CPU kernels as candle custom ops so that the spectral
//! convolution layers in `harmonics-nn` can move signals between the spatial
//! grid and a truncated coefficient space. Two transform families share one
//! trait surface:
//!
//! - [`RealFft2`] / [`InverseRealFft2`]: band-limited 2D real Fourier
//!   transforms, a periodic-domain substitute for spherical harmonics.
//! - [`InverseRealSht`]: synthesis of a real field on the sphere from
//!   spherical-harmonic coefficients (equiangular or Legendre-Gauss grid).
//!
//! Complex arrays are stored as real tensors with a trailing size-2 axis
//! (re, im), since candle has no complex dtype.

pub mod fft;
pub mod rfft2;
pub mod sht;
pub mod transform;

pub use rfft2::{InverseRealFft2, RealFft2};
pub use sht::{GridType, InverseRealSht};
pub use transform::SpectralTransform;
