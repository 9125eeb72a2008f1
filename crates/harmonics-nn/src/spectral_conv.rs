//! Spectral convolution on the sphere.
//!
//! Forward transform into a truncated coefficient space, structured complex
//! contraction against a learned weight, inverse transform back. Works with
//! any [`SpectralTransform`] pair, so the same operator runs on spherical
//! harmonics or on the periodic-domain Fourier substitute.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor, Var};
use harmonics_core::{HarmonicsError, Result};
use harmonics_transforms::SpectralTransform;
use tracing::debug;

pub use crate::contractions::OperatorType;
use crate::contractions::contract;

/// Check that a transform pair agrees on the coefficient truncation used for
/// the contraction; grid resolutions may differ (resampling).
pub(crate) fn check_transform_pair(
    forward: &dyn SpectralTransform,
    inverse: &dyn SpectralTransform,
) -> Result<(usize, usize, bool)> {
    if forward.lmax() != inverse.lmax() || forward.mmax() != inverse.mmax() {
        return Err(HarmonicsError::TruncationMismatch {
            forward_lmax: forward.lmax(),
            forward_mmax: forward.mmax(),
            inverse_lmax: inverse.lmax(),
            inverse_mmax: inverse.mmax(),
        });
    }
    let scale_residual =
        forward.nlat() != inverse.nlat() || forward.nlon() != inverse.nlon();
    Ok((inverse.lmax(), inverse.mmax(), scale_residual))
}

/// Per-latitude init scale: `sqrt(gain / in_channels)` everywhere, doubled
/// (`sqrt(2)`) at l = 0 to compensate the energy split of real signals.
pub(crate) fn spectral_init_scale(
    weight_dims: &[usize],
    lat_axis: usize,
    gain: f64,
    in_channels: usize,
    device: &Device,
) -> Result<Tensor> {
    let modes_lat = weight_dims[lat_axis];
    let base = (gain / in_channels as f64).sqrt() as f32;
    let mut scale = vec![base; modes_lat];
    scale[0] = base * std::f32::consts::SQRT_2;
    let mut shape = vec![1usize; weight_dims.len() + 1];
    shape[lat_axis] = modes_lat;
    Ok(Tensor::from_vec(scale, shape, device)?)
}

/// Dense spectral convolution operator.
///
/// `forward` returns `(output, residual)`; combining the two (skip
/// connection) is the caller's business. The residual is the input itself
/// when both transforms share a grid, or the input projected onto the output
/// grid when they do not.
pub struct SpectralConvS2 {
    forward_transform: Arc<dyn SpectralTransform>,
    inverse_transform: Arc<dyn SpectralTransform>,
    operator_type: OperatorType,
    weight: Var,
    bias: Option<Var>,
    scale_residual: bool,
    modes_lat: usize,
    modes_lon: usize,
}

impl SpectralConvS2 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        forward_transform: Arc<dyn SpectralTransform>,
        inverse_transform: Arc<dyn SpectralTransform>,
        in_channels: usize,
        out_channels: usize,
        gain: f64,
        operator_type: OperatorType,
        bias: bool,
        device: &Device,
    ) -> Result<Self> {
        let (modes_lat, modes_lon, scale_residual) =
            check_transform_pair(forward_transform.as_ref(), inverse_transform.as_ref())?;

        let dims = operator_type.weight_dims(in_channels, out_channels, modes_lat, modes_lon, false);
        let scale = spectral_init_scale(&dims, 2, gain, in_channels, device)?;
        let mut packed = dims.clone();
        packed.push(2);
        let init = Tensor::randn(0f32, 1f32, packed, device)?.broadcast_mul(&scale)?;
        let weight = Var::from_tensor(&init)?;

        let bias = if bias {
            Some(Var::zeros((1, out_channels, 1, 1), DType::F32, device)?)
        } else {
            None
        };

        debug!(
            %operator_type,
            in_channels,
            out_channels,
            modes_lat,
            modes_lon,
            scale_residual,
            "built spectral convolution"
        );

        Ok(Self {
            forward_transform,
            inverse_transform,
            operator_type,
            weight,
            bias,
            scale_residual,
            modes_lat,
            modes_lon,
        })
    }

    pub fn modes_lat(&self) -> usize {
        self.modes_lat
    }

    pub fn modes_lon(&self) -> usize {
        self.modes_lon
    }

    pub fn operator_type(&self) -> OperatorType {
        self.operator_type
    }

    pub fn scale_residual(&self) -> bool {
        self.scale_residual
    }

    pub fn weight(&self) -> &Var {
        &self.weight
    }

    pub fn parameters(&self) -> Vec<&Var> {
        let mut params = vec![&self.weight];
        if let Some(b) = &self.bias {
            params.push(b);
        }
        params
    }

    /// Returns `(output, residual)`. The output carries the caller's dtype;
    /// the residual stays in F32 working precision.
    pub fn forward(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        let dtype = x.dtype();
        let x = x.to_dtype(DType::F32)?;
        let mut residual = x.clone();

        let coeffs = self.forward_transform.forward(&x)?;
        if self.scale_residual {
            residual = self.inverse_transform.forward(&coeffs)?;
        }

        let coeffs = contract(self.operator_type, &coeffs, self.weight.as_tensor(), false)?;
        let mut out = self.inverse_transform.forward(&coeffs)?;

        if let Some(bias) = &self.bias {
            out = out.broadcast_add(bias.as_tensor())?;
        }
        let out = out.to_dtype(dtype)?;
        Ok((out, residual))
    }
}
