//! Inverse real spherical-harmonic transform.
//!
//! Synthesizes a real field on an `(nlat, nlon)` sphere grid from truncated
//! spherical-harmonic coefficients `(..., lmax, mmax, 2)`: a contraction
//! against a precomputed table of normalized associated Legendre functions in
//! latitude, then an inverse FFT in longitude. Normalization follows the
//! "backward" convention (no 1/N on the synthesis FFT).
//!
//! Only synthesis is provided; the analysis direction (quadrature over the
//! sphere) is not needed by the layers in this workspace.

use std::str::FromStr;
use std::sync::Arc;

use candle_core::{CpuStorage, CustomOp1, DType, Error, Layout, Shape, Tensor};
use harmonics_core::{HarmonicsError, Result};
use serde::{Deserialize, Serialize};

use crate::fft::{fft_in_place, hermitian_extend_row, C32};
use crate::rfft2::check_truncation;
use crate::transform::SpectralTransform;

/// Latitudinal sampling of the sphere grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridType {
    /// Colatitudes at `pi * (j + 0.5) / nlat`.
    Equiangular,
    /// Colatitudes at the Gauss-Legendre quadrature nodes.
    LegendreGauss,
}

impl FromStr for GridType {
    type Err = HarmonicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "equiangular" => Ok(GridType::Equiangular),
            "legendre-gauss" => Ok(GridType::LegendreGauss),
            other => Err(HarmonicsError::UnknownGridType(other.to_string())),
        }
    }
}

/// cos(colatitude) for each grid row, north to south.
fn grid_cos_nodes(nlat: usize, grid: GridType) -> Vec<f64> {
    match grid {
        GridType::Equiangular => (0..nlat)
            .map(|j| (std::f64::consts::PI * (j as f64 + 0.5) / nlat as f64).cos())
            .collect(),
        GridType::LegendreGauss => legendre_gauss_cos_nodes(nlat),
    }
}

/// Roots of the Legendre polynomial P_n via Newton iteration, descending in
/// cos(theta).
fn legendre_gauss_cos_nodes(n: usize) -> Vec<f64> {
    let mut nodes = vec![0.0f64; n];
    for (k, node) in nodes.iter_mut().enumerate() {
        let mut x = (std::f64::consts::PI * (k as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (mut p0, mut p1) = (1.0f64, x);
            for l in 2..=n {
                let p2 = ((2 * l - 1) as f64 * x * p1 - (l - 1) as f64 * p0) / l as f64;
                p0 = p1;
                p1 = p2;
            }
            let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
            let dx = p1 / dp;
            x -= dx;
            if dx.abs() < 1e-14 {
                break;
            }
        }
        *node = x;
    }
    nodes
}

/// Table of orthonormalized associated Legendre functions
/// `pct[(l * mmax + m) * nlat + t]`, zero where `m > l`. Uses the stable
/// three-term recurrence in l with the Condon-Shortley phase.
fn legendre_table(lmax: usize, mmax: usize, cos_nodes: &[f64]) -> Vec<f32> {
    let nlat = cos_nodes.len();
    let mut pct = vec![0f32; lmax * mmax * nlat];
    let norm0 = (1.0 / (4.0 * std::f64::consts::PI)).sqrt();

    for (t, &x) in cos_nodes.iter().enumerate() {
        let s = (1.0 - x * x).max(0.0).sqrt();
        let mut pmm = norm0;
        for m in 0..mmax {
            if m > 0 {
                pmm *= -((2 * m + 1) as f64 / (2 * m) as f64).sqrt() * s;
            }
            if m >= lmax {
                break;
            }
            pct[(m * mmax + m) * nlat + t] = pmm as f32;
            if m + 1 < lmax {
                let pm1 = ((2 * m + 3) as f64).sqrt() * x * pmm;
                pct[((m + 1) * mmax + m) * nlat + t] = pm1 as f32;
                let (mut plm2, mut plm1) = (pmm, pm1);
                for l in (m + 2)..lmax {
                    let a = ((4 * l * l - 1) as f64 / (l * l - m * m) as f64).sqrt();
                    let b = (((l - 1) * (l - 1) - m * m) as f64
                        / (4 * (l - 1) * (l - 1) - 1) as f64)
                        .sqrt();
                    let p = a * (x * plm1 - b * plm2);
                    pct[(l * mmax + m) * nlat + t] = p as f32;
                    plm2 = plm1;
                    plm1 = p;
                }
            }
        }
    }
    pct
}

#[derive(Debug, Clone)]
struct IshtOp {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
    pct: Arc<Vec<f32>>,
}

impl CustomOp1 for IshtOp {
    fn name(&self) -> &'static str {
        "isht"
    }

    fn cpu_fwd(&self, storage: &CpuStorage, layout: &Layout) -> candle_core::Result<(CpuStorage, Shape)> {
        let data = storage.as_slice::<f32>()?;
        let data = match layout.contiguous_offsets() {
            Some((start, end)) => &data[start..end],
            None => return Err(Error::Msg("isht expects a contiguous input".to_string())),
        };
        let dims = layout.shape().dims();
        let expect = [self.lmax, self.mmax, 2];
        if dims.len() < 3 || dims[dims.len() - 3..] != expect {
            return Err(Error::Msg(format!(
                "isht expects trailing dims {expect:?}, got {dims:?}"
            )));
        }
        let (h, w) = (self.nlat, self.nlon);
        let per_in = self.lmax * self.mmax * 2;
        let batch = layout.shape().elem_count() / per_in;

        let mut out = vec![0f32; batch * h * w];
        let mut rowbuf = vec![C32::new(0.0, 0.0); w];
        for b in 0..batch {
            let coeffs = &data[b * per_in..(b + 1) * per_in];
            for t in 0..h {
                rowbuf.iter_mut().for_each(|c| *c = C32::new(0.0, 0.0));
                for m in 0..self.mmax {
                    let mut acc_re = 0f32;
                    let mut acc_im = 0f32;
                    for l in m..self.lmax {
                        let p = self.pct[(l * self.mmax + m) * h + t];
                        acc_re += coeffs[(l * self.mmax + m) * 2] * p;
                        acc_im += coeffs[(l * self.mmax + m) * 2 + 1] * p;
                    }
                    rowbuf[m] = C32::new(acc_re, acc_im);
                }
                hermitian_extend_row(&mut rowbuf, self.mmax);
                fft_in_place(&mut rowbuf, true);
                for wi in 0..w {
                    out[b * h * w + t * w + wi] = rowbuf[wi].re;
                }
            }
        }

        let mut out_dims = dims[..dims.len() - 3].to_vec();
        out_dims.extend([h, w]);
        Ok((CpuStorage::F32(out), Shape::from(out_dims)))
    }
}

/// Inverse real spherical-harmonic transform onto an `(nlat, nlon)` grid.
///
/// No backward pass: this transform backs the random-field sampler, which
/// draws noise rather than propagating gradients.
#[derive(Debug, Clone)]
pub struct InverseRealSht {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
    grid: GridType,
    pct: Arc<Vec<f32>>,
}

impl InverseRealSht {
    /// `lmax` defaults to `nlat`, `mmax` to `nlon/2 + 1`.
    pub fn new(
        nlat: usize,
        nlon: usize,
        lmax: Option<usize>,
        mmax: Option<usize>,
        grid: GridType,
    ) -> Result<Self> {
        let lmax = lmax.unwrap_or(nlat);
        let mmax = mmax.unwrap_or(nlon / 2 + 1);
        check_truncation(nlat, nlon, lmax, mmax)?;
        let nodes = grid_cos_nodes(nlat, grid);
        let pct = Arc::new(legendre_table(lmax, mmax, &nodes));
        tracing::debug!(nlat, nlon, lmax, mmax, ?grid, "built inverse spherical-harmonic transform");
        Ok(Self {
            nlat,
            nlon,
            lmax,
            mmax,
            grid,
            pct,
        })
    }

    pub fn grid(&self) -> GridType {
        self.grid
    }
}

impl SpectralTransform for InverseRealSht {
    fn nlat(&self) -> usize {
        self.nlat
    }
    fn nlon(&self) -> usize {
        self.nlon
    }
    fn lmax(&self) -> usize {
        self.lmax
    }
    fn mmax(&self) -> usize {
        self.mmax
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = x.to_dtype(DType::F32)?.contiguous()?;
        Ok(x.apply_op1_no_bwd(&IshtOp {
            nlat: self.nlat,
            nlon: self.nlon,
            lmax: self.lmax,
            mmax: self.mmax,
            pct: Arc::clone(&self.pct),
        })?)
    }
}
