//! Low-rank factorized spectral convolution.
//!
//! Same external contract as [`SpectralConvS2`](crate::SpectralConvS2); only
//! the weight storage and contraction differ. The spectral weight lives in a
//! complex factorized representation (dense, CP or Tucker) and is either
//! reconstructed to a dense tensor before the standard contraction, or, for
//! CP, contracted factor by factor without ever materializing the dense
//! weight.

use std::str::FromStr;
use std::sync::Arc;

use candle_core::{DType, Device, Tensor, Var};
use harmonics_core::{HarmonicsError, Result};
use harmonics_transforms::SpectralTransform;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contractions::{contract, OperatorType};
use crate::cplx::CTensor;
use crate::spectral_conv::check_transform_pair;

/// Decomposition kind. All kinds are complex-valued; parsing accepts names
/// with or without the `Complex` prefix and coerces to the complex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Factorization {
    Dense,
    Cp,
    Tucker,
}

impl Factorization {
    /// Coerced kind label, always `Complex`-prefixed.
    pub fn label(&self) -> &'static str {
        match self {
            Factorization::Dense => "ComplexDense",
            Factorization::Cp => "ComplexCP",
            Factorization::Tucker => "ComplexTucker",
        }
    }
}

impl FromStr for Factorization {
    type Err = HarmonicsError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let stem = lower.strip_prefix("complex").unwrap_or(&lower);
        match stem {
            "dense" | "" => Ok(Factorization::Dense),
            "cp" => Ok(Factorization::Cp),
            "tucker" => Ok(Factorization::Tucker),
            _ => Err(HarmonicsError::UnknownFactorization(s.to_string())),
        }
    }
}

/// Target rank of the decomposition, either a fraction of the dense size or
/// an absolute rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rank {
    Fraction(f64),
    Absolute(usize),
}

impl Rank {
    fn validate(&self) -> Result<()> {
        match self {
            Rank::Fraction(f) if !f.is_finite() || *f <= 0.0 => Err(
                HarmonicsError::InvalidRank(format!("rank fraction must be positive, got {f}")),
            ),
            Rank::Absolute(0) => Err(HarmonicsError::InvalidRank(
                "absolute rank must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// CP rank chosen so the factor parameter count is about `fraction` of
    /// the dense parameter count.
    fn cp_rank(&self, dims: &[usize]) -> Result<usize> {
        self.validate()?;
        Ok(match self {
            Rank::Absolute(r) => *r,
            Rank::Fraction(f) => {
                let dense: usize = dims.iter().product();
                let per_rank: usize = dims.iter().sum();
                ((f * dense as f64 / per_rank as f64).round() as usize).max(1)
            }
        })
    }

    /// Tucker rank per mode: a fraction of each mode size, or the same
    /// absolute rank everywhere (capped by the mode size).
    fn tucker_ranks(&self, dims: &[usize]) -> Result<Vec<usize>> {
        self.validate()?;
        Ok(dims
            .iter()
            .map(|&d| match self {
                Rank::Absolute(r) => (*r).min(d),
                Rank::Fraction(f) => ((f * d as f64).round() as usize).clamp(1, d),
            })
            .collect())
    }
}

/// Complex weight tensor in dense or factorized storage. All leaves are real
/// `Var`s with a trailing (re, im) axis.
pub enum FactorizedTensor {
    Dense {
        weight: Var,
    },
    /// `weight = sum_r lambda[r] * outer(factors[0][:,r], ..., factors[k][:,r])`
    Cp {
        lambdas: Var,
        factors: Vec<Var>,
    },
    /// Core tensor of shape `ranks` with one factor matrix per mode.
    Tucker {
        core: Var,
        factors: Vec<Var>,
    },
}

impl FactorizedTensor {
    /// Allocate a zeroed decomposition of a weight with the given (complex)
    /// dimensions.
    pub fn new(
        dims: &[usize],
        rank: &Rank,
        factorization: Factorization,
        device: &Device,
    ) -> Result<Self> {
        match factorization {
            Factorization::Dense => {
                let mut packed = dims.to_vec();
                packed.push(2);
                Ok(FactorizedTensor::Dense {
                    weight: Var::zeros(packed, DType::F32, device)?,
                })
            }
            Factorization::Cp => {
                let r = rank.cp_rank(dims)?;
                let lambdas = Var::zeros((r, 2), DType::F32, device)?;
                let factors = dims
                    .iter()
                    .map(|&d| Var::zeros((d, r, 2), DType::F32, device))
                    .collect::<candle_core::Result<Vec<_>>>()?;
                Ok(FactorizedTensor::Cp { lambdas, factors })
            }
            Factorization::Tucker => {
                let ranks = rank.tucker_ranks(dims)?;
                let mut core_dims = ranks.clone();
                core_dims.push(2);
                let core = Var::zeros(core_dims, DType::F32, device)?;
                let factors = dims
                    .iter()
                    .zip(&ranks)
                    .map(|(&d, &r)| Var::zeros((d, r, 2), DType::F32, device))
                    .collect::<candle_core::Result<Vec<_>>>()?;
                Ok(FactorizedTensor::Tucker { core, factors })
            }
        }
    }

    /// Fill every leaf with independent `N(mean, std^2)` samples.
    pub fn normal_(&self, mean: f64, std: f64) -> Result<()> {
        for var in self.leaves() {
            let noise = Tensor::randn(0f32, 1f32, var.dims(), var.device())?;
            var.set(&noise.affine(std, mean)?)?;
        }
        Ok(())
    }

    fn leaves(&self) -> Vec<&Var> {
        match self {
            FactorizedTensor::Dense { weight } => vec![weight],
            FactorizedTensor::Cp { lambdas, factors } => {
                let mut vars = vec![lambdas];
                vars.extend(factors.iter());
                vars
            }
            FactorizedTensor::Tucker { core, factors } => {
                let mut vars = vec![core];
                vars.extend(factors.iter());
                vars
            }
        }
    }

    /// Reconstruct the packed dense weight.
    pub fn to_dense(&self) -> Result<Tensor> {
        match self {
            FactorizedTensor::Dense { weight } => Ok(weight.as_tensor().clone()),
            FactorizedTensor::Cp { lambdas, factors } => {
                let mut dims = Vec::with_capacity(factors.len());
                // acc: (prod processed dims, rank), seeded with the lambdas.
                let mut acc = CTensor::from_packed(lambdas.as_tensor())?.reshape(&[
                    1,
                    lambdas.dims()[0],
                ])?;
                for factor in factors {
                    let (d, r) = (factor.dims()[0], factor.dims()[1]);
                    let f = CTensor::from_packed(factor.as_tensor())?;
                    let p = acc.dims()[0];
                    acc = acc
                        .unsqueeze(1)?
                        .broadcast_mul(&f.unsqueeze(0)?)?
                        .reshape(&[p * d, r])?;
                    dims.push(d);
                }
                acc.sum(1)?.reshape(&dims)?.into_packed()
            }
            FactorizedTensor::Tucker { core, factors } => {
                let mut acc = CTensor::from_packed(core.as_tensor())?;
                let mut dims: Vec<usize> = acc.dims().to_vec();
                for (i, factor) in factors.iter().enumerate() {
                    let (d, r) = (factor.dims()[0], factor.dims()[1]);
                    let a: usize = dims[..i].iter().product();
                    let b: usize = dims[i + 1..].iter().product();
                    // Mode-i product: move the rank axis last, matmul with
                    // the transposed factor, move the result axis back.
                    let ft = CTensor::from_packed(factor.as_tensor())?.permute(&[1, 0])?;
                    acc = acc
                        .reshape(&[a, r, b])?
                        .permute(&[0, 2, 1])?
                        .reshape(&[a * b, r])?
                        .matmul(&ft)?
                        .reshape(&[a, b, d])?
                        .permute(&[0, 2, 1])?;
                    dims[i] = d;
                    acc = acc.reshape(&dims)?;
                }
                acc.into_packed()
            }
        }
    }
}

/// Contraction strategy for the factorized operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Implementation {
    /// Densify the weight, then run the standard contraction.
    Reconstructed,
    /// Contract the factors lazily. Applies to non-separable CP; other
    /// storages gain nothing from laziness and fall back to reconstruction.
    Factorized,
}

impl FromStr for Implementation {
    type Err = HarmonicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reconstructed" => Ok(Implementation::Reconstructed),
            "factorized" => Ok(Implementation::Factorized),
            other => Err(HarmonicsError::UnknownFactorization(format!(
                "implementation {other:?} (expected \"reconstructed\" or \"factorized\")"
            ))),
        }
    }
}

/// Spectral convolution with factorized weight storage.
pub struct FactorizedSpectralConvS2 {
    forward_transform: Arc<dyn SpectralTransform>,
    inverse_transform: Arc<dyn SpectralTransform>,
    operator_type: OperatorType,
    weight: FactorizedTensor,
    bias: Option<Var>,
    separable: bool,
    implementation: Implementation,
    scale_residual: bool,
    modes_lat: usize,
    modes_lon: usize,
}

impl FactorizedSpectralConvS2 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        forward_transform: Arc<dyn SpectralTransform>,
        inverse_transform: Arc<dyn SpectralTransform>,
        in_channels: usize,
        out_channels: usize,
        gain: f64,
        operator_type: OperatorType,
        rank: Rank,
        factorization: Factorization,
        separable: bool,
        implementation: Implementation,
        bias: bool,
        device: &Device,
    ) -> Result<Self> {
        let (modes_lat, modes_lon, scale_residual) =
            check_transform_pair(forward_transform.as_ref(), inverse_transform.as_ref())?;

        if separable && in_channels != out_channels {
            return Err(HarmonicsError::SeparableChannelMismatch {
                in_channels,
                out_channels,
            });
        }

        let dims =
            operator_type.weight_dims(in_channels, out_channels, modes_lat, modes_lon, separable);
        let weight = FactorizedTensor::new(&dims, &rank, factorization, device)?;
        weight.normal_(0.0, (gain / in_channels as f64).sqrt())?;

        let bias = if bias {
            Some(Var::zeros((1, out_channels, 1, 1), DType::F32, device)?)
        } else {
            None
        };

        debug!(
            %operator_type,
            factorization = factorization.label(),
            ?rank,
            separable,
            ?implementation,
            in_channels,
            out_channels,
            modes_lat,
            modes_lon,
            "built factorized spectral convolution"
        );

        Ok(Self {
            forward_transform,
            inverse_transform,
            operator_type,
            weight,
            bias,
            separable,
            implementation,
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

    pub fn scale_residual(&self) -> bool {
        self.scale_residual
    }

    pub fn weight(&self) -> &FactorizedTensor {
        &self.weight
    }

    pub fn parameters(&self) -> Vec<&Var> {
        let mut params = self.weight.leaves();
        if let Some(b) = &self.bias {
            params.push(b);
        }
        params
    }

    fn contract_coeffs(&self, coeffs: &Tensor) -> Result<Tensor> {
        match (&self.weight, self.implementation, self.separable) {
            (FactorizedTensor::Cp { lambdas, factors }, Implementation::Factorized, false) => {
                contract_cp_lazy(self.operator_type, coeffs, lambdas, factors)
            }
            _ => contract(
                self.operator_type,
                coeffs,
                &self.weight.to_dense()?,
                self.separable,
            ),
        }
    }

    /// Returns `(output, residual)`, mirroring the dense operator.
    pub fn forward(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        let dtype = x.dtype();
        let x = x.to_dtype(DType::F32)?;
        let mut residual = x.clone();

        let coeffs = self.forward_transform.forward(&x)?;
        if self.scale_residual {
            residual = self.inverse_transform.forward(&coeffs)?;
        }

        let coeffs = self.contract_coeffs(&coeffs)?;
        let mut out = self.inverse_transform.forward(&coeffs)?;

        if let Some(bias) = &self.bias {
            out = out.broadcast_add(bias.as_tensor())?;
        }
        let out = out.to_dtype(dtype)?;
        Ok((out, residual))
    }
}

/// Lazy CP contraction for the non-separable case: the input is contracted
/// against one factor at a time, with the out-channel factor applied last.
/// Factor order matches the weight dims: `[out, in, <mode factors...>]`.
fn contract_cp_lazy(
    operator_type: OperatorType,
    x: &Tensor,
    lambdas: &Var,
    factors: &[Var],
) -> Result<Tensor> {
    let r = lambdas.dims()[0];
    let xc = CTensor::from_packed(x)?;
    let (batch, in_ch, l, m) = {
        let d = xc.dims();
        (d[0], d[1], d[2], d[3])
    };
    let fc: Vec<CTensor> = factors
        .iter()
        .map(|f| CTensor::from_packed(f.as_tensor()))
        .collect::<Result<Vec<_>>>()?;
    let lam = CTensor::from_packed(lambdas.as_tensor())?;

    // sum_i x[b,i,l,m] * U_in[i,r] -> (b,l,m,r)
    let u_in = fc[1].reshape(&[1, in_ch, 1, 1, r])?;
    let mut t = xc.unsqueeze(4)?.broadcast_mul(&u_in)?.sum(1)?;

    t = t.broadcast_mul(&lam.reshape(&[1, 1, 1, r])?)?;

    match operator_type {
        OperatorType::Diagonal => {
            // factors: [out, in, lat, lon]
            t = t.broadcast_mul(&fc[2].reshape(&[1, l, 1, r])?)?;
            t = t.broadcast_mul(&fc[3].reshape(&[1, 1, m, r])?)?;
        }
        OperatorType::DriscollHealy => {
            // factors: [out, in, lat]
            t = t.broadcast_mul(&fc[2].reshape(&[1, l, 1, r])?)?;
        }
        OperatorType::BlockDiagonal => {
            // factors: [out, in, lat, lon, lon']; the input's m axis pairs
            // with the primed factor and is summed out before the output m
            // axis is synthesized.
            t = t.broadcast_mul(&fc[4].reshape(&[1, 1, m, r])?)?.sum(2)?;
            t = t.broadcast_mul(&fc[2].reshape(&[1, l, r])?)?;
            t = t
                .unsqueeze(2)?
                .broadcast_mul(&fc[3].reshape(&[1, 1, m, r])?)?;
        }
    }

    // sum_r t[b,l,m,r] * U_out[o,r] -> (b,o,l,m)
    let out_ch = fc[0].dims()[0];
    let u_out = fc[0].reshape(&[1, 1, 1, out_ch, r])?;
    let out = t.unsqueeze(3)?.broadcast_mul(&u_out)?.sum(4)?;
    debug_assert_eq!(out.dims(), &[batch, l, m, out_ch]);
    out.permute(&[0, 3, 1, 2])?.into_packed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use harmonics_transforms::{InverseRealFft2, RealFft2};

    fn fft_pair(
        nlat: usize,
        nlon: usize,
    ) -> Result<(Arc<dyn SpectralTransform>, Arc<dyn SpectralTransform>)> {
        let fwd = RealFft2::new(nlat, nlon, None, None)?;
        let inv = InverseRealFft2::new(nlat, nlon, None, None)?;
        Ok((Arc::new(fwd), Arc::new(inv)))
    }

    fn assert_close(a: &Tensor, b: &Tensor, tol: f32) -> Result<()> {
        let av = a.flatten_all()?.to_vec1::<f32>()?;
        let bv = b.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(av.len(), bv.len());
        for i in 0..av.len() {
            assert!(
                (av[i] - bv[i]).abs() < tol,
                "mismatch at {}: {} vs {}",
                i,
                av[i],
                bv[i]
            );
        }
        Ok(())
    }

    #[test]
    fn test_factorization_parsing_coerces_complex() {
        assert_eq!("cp".parse::<Factorization>().ok(), Some(Factorization::Cp));
        assert_eq!(
            "ComplexTucker".parse::<Factorization>().ok(),
            Some(Factorization::Tucker)
        );
        assert_eq!("Dense".parse::<Factorization>().unwrap().label(), "ComplexDense");
        assert!("svd".parse::<Factorization>().is_err());
    }

    #[test]
    fn test_rank_resolution() -> Result<()> {
        let dims = [4, 4, 8, 9];
        assert_eq!(Rank::Absolute(7).cp_rank(&dims)?, 7);
        let r = Rank::Fraction(0.5).cp_rank(&dims)?;
        // 0.5 * 1152 / 25 = 23.04
        assert_eq!(r, 23);
        assert_eq!(Rank::Fraction(0.5).tucker_ranks(&dims)?, vec![2, 2, 4, 5]);
        assert!(Rank::Fraction(-0.1).cp_rank(&dims).is_err());
        assert!(Rank::Absolute(0).cp_rank(&dims).is_err());
        Ok(())
    }

    #[test]
    fn test_cp_to_dense_matches_manual_sum() -> Result<()> {
        let device = Device::Cpu;
        let dims = [2, 3];
        let cp = FactorizedTensor::new(&dims, &Rank::Absolute(2), Factorization::Cp, &device)?;
        cp.normal_(0.0, 1.0)?;
        let dense = cp.to_dense()?;
        assert_eq!(dense.dims(), &[2, 3, 2]);

        let (lambdas, factors) = match &cp {
            FactorizedTensor::Cp { lambdas, factors } => (lambdas, factors),
            _ => unreachable!(),
        };
        let lam = lambdas.to_vec2::<f32>()?;
        let f0 = factors[0].to_vec3::<f32>()?;
        let f1 = factors[1].to_vec3::<f32>()?;
        let got = dense.to_vec3::<f32>()?;
        for i in 0..2 {
            for j in 0..3 {
                let (mut re, mut im) = (0f32, 0f32);
                for r in 0..2 {
                    // lambda * f0[i,r] * f1[j,r], complex.
                    let (ar, ai) = (lam[r][0], lam[r][1]);
                    let (br, bi) = (f0[i][r][0], f0[i][r][1]);
                    let (cr, ci) = (f1[j][r][0], f1[j][r][1]);
                    let (pr, pi) = (ar * br - ai * bi, ar * bi + ai * br);
                    re += pr * cr - pi * ci;
                    im += pr * ci + pi * cr;
                }
                assert!((got[i][j][0] - re).abs() < 1e-5);
                assert!((got[i][j][1] - im).abs() < 1e-5);
            }
        }
        Ok(())
    }

    #[test]
    fn test_tucker_to_dense_shape_and_rank_one_case() -> Result<()> {
        let device = Device::Cpu;
        let dims = [3, 4];
        let tk = FactorizedTensor::new(&dims, &Rank::Absolute(1), Factorization::Tucker, &device)?;
        // Rank-1 Tucker is an outer product of the two factor columns scaled
        // by the scalar core.
        let (core, factors) = match &tk {
            FactorizedTensor::Tucker { core, factors } => (core, factors),
            _ => unreachable!(),
        };
        core.set(&Tensor::from_vec(vec![2f32, 0.0], (1, 1, 2), &device)?)?;
        let f0: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let f1: Vec<f32> = (0..8).map(|i| (i % 3) as f32).collect();
        factors[0].set(&Tensor::from_vec(f0.clone(), (3, 1, 2), &device)?)?;
        factors[1].set(&Tensor::from_vec(f1.clone(), (4, 1, 2), &device)?)?;

        let dense = tk.to_dense()?;
        assert_eq!(dense.dims(), &[3, 4, 2]);
        let got = dense.to_vec3::<f32>()?;
        for i in 0..3 {
            for j in 0..4 {
                let (ar, ai) = (f0[2 * i], f0[2 * i + 1]);
                let (br, bi) = (f1[2 * j], f1[2 * j + 1]);
                let re = 2.0 * (ar * br - ai * bi);
                let im = 2.0 * (ar * bi + ai * br);
                assert!((got[i][j][0] - re).abs() < 1e-5, "re at ({i},{j})");
                assert!((got[i][j][1] - im).abs() < 1e-5, "im at ({i},{j})");
            }
        }
        Ok(())
    }

    #[test]
    fn test_lazy_cp_matches_reconstructed() -> Result<()> {
        let device = Device::Cpu;
        let (b, in_ch, out_ch, l, m) = (2, 3, 4, 5, 6);
        let x = Tensor::randn(0f32, 1f32, (b, in_ch, l, m, 2), &device)?;
        for op in [
            OperatorType::Diagonal,
            OperatorType::DriscollHealy,
            OperatorType::BlockDiagonal,
        ] {
            let dims = op.weight_dims(in_ch, out_ch, l, m, false);
            let cp = FactorizedTensor::new(&dims, &Rank::Absolute(3), Factorization::Cp, &device)?;
            cp.normal_(0.0, 0.5)?;
            let (lambdas, factors) = match &cp {
                FactorizedTensor::Cp { lambdas, factors } => (lambdas, factors),
                _ => unreachable!(),
            };
            let lazy = contract_cp_lazy(op, &x, lambdas, factors)?;
            let dense = contract(op, &x, &cp.to_dense()?, false)?;
            assert_eq!(lazy.dims(), &[b, out_ch, l, m, 2]);
            assert_close(&lazy, &dense, 1e-4)?;
        }
        Ok(())
    }

    #[test]
    fn test_separable_requires_matching_channels() -> Result<()> {
        let device = Device::Cpu;
        let (fwd, inv) = fft_pair(8, 16)?;
        let res = FactorizedSpectralConvS2::new(
            fwd,
            inv,
            2,
            3,
            1.0,
            OperatorType::Diagonal,
            Rank::Fraction(0.5),
            Factorization::Cp,
            true,
            Implementation::Reconstructed,
            false,
            &device,
        );
        assert!(matches!(
            res,
            Err(HarmonicsError::SeparableChannelMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_forward_shapes_dense_factorization() -> Result<()> {
        let device = Device::Cpu;
        let (fwd, inv) = fft_pair(8, 16)?;
        let conv = FactorizedSpectralConvS2::new(
            fwd,
            inv,
            2,
            5,
            1.0,
            OperatorType::DriscollHealy,
            Rank::Fraction(1.0),
            Factorization::Dense,
            false,
            Implementation::Reconstructed,
            true,
            &device,
        )?;
        let x = Tensor::randn(0f32, 1f32, (3, 2, 8, 16), &device)?;
        let (y, residual) = conv.forward(&x)?;
        assert_eq!(y.dims(), &[3, 5, 8, 16]);
        assert_eq!(residual.dims(), &[3, 2, 8, 16]);
        Ok(())
    }

    #[test]
    fn test_forward_lazy_vs_reconstructed_cp() -> Result<()> {
        let device = Device::Cpu;
        let (fwd, inv) = fft_pair(8, 16)?;
        let conv = FactorizedSpectralConvS2::new(
            fwd.clone(),
            inv.clone(),
            2,
            2,
            1.0,
            OperatorType::Diagonal,
            Rank::Absolute(4),
            Factorization::Cp,
            false,
            Implementation::Factorized,
            false,
            &device,
        )?;
        let x = Tensor::randn(0f32, 1f32, (1, 2, 8, 16), &device)?;
        let (y_lazy, _) = conv.forward(&x)?;

        // Same weights, reconstructed strategy.
        let coeffs = fwd.forward(&x)?;
        let dense = contract(OperatorType::Diagonal, &coeffs, &conv.weight().to_dense()?, false)?;
        let y_dense = inv.forward(&dense)?;
        assert_close(&y_lazy, &y_dense, 1e-4)?;
        Ok(())
    }

    #[test]
    fn test_separable_forward_preserves_channels() -> Result<()> {
        let device = Device::Cpu;
        let (fwd, inv) = fft_pair(8, 16)?;
        let conv = FactorizedSpectralConvS2::new(
            fwd,
            inv,
            3,
            3,
            1.0,
            OperatorType::Diagonal,
            Rank::Fraction(0.5),
            Factorization::Tucker,
            true,
            Implementation::Factorized,
            false,
            &device,
        )?;
        let x = Tensor::randn(0f32, 1f32, (2, 3, 8, 16), &device)?;
        let (y, _) = conv.forward(&x)?;
        assert_eq!(y.dims(), &[2, 3, 8, 16]);
        Ok(())
    }
}
