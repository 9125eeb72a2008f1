//! Layer building blocks for spherical neural operators on candle.
//!
//! The core of this crate is [`SpectralConvS2`]: forward spectral transform,
//! structured linear contraction in coefficient space, inverse transform,
//! with a residual path that tracks grid-resolution changes between the two
//! transforms. [`FactorizedSpectralConvS2`] is the same operator with the
//! spectral weight stored in a low-rank decomposition. Around it:
//!
//! - [`init::trunc_normal`]: truncated-normal parameter initialization
//! - [`DropPath`]: per-sample stochastic depth
//! - [`Mlp`]: pointwise two-layer feed-forward block
//! - [`GaussianRandomFieldS2`]: Matern Gaussian random fields on the sphere
//!
//! Layers hold their parameters as `candle_core::Var` and expose them via
//! `parameters()`; optimization, autodiff and device placement belong to the
//! caller.

pub mod contractions;
mod cplx;
pub mod drop_path;
pub mod factorized;
pub mod init;
pub mod mlp;
pub mod random_fields;
pub mod spectral_conv;

pub use drop_path::DropPath;
pub use factorized::{Factorization, FactorizedSpectralConvS2, FactorizedTensor, Implementation, Rank};
pub use mlp::{Mlp, MlpConfig};
pub use random_fields::GaussianRandomFieldS2;
pub use spectral_conv::{OperatorType, SpectralConvS2};
