//! Band-limited real 2D Fourier transforms as candle custom ops.
//!
//! `RealFft2` maps `(..., nlat, nlon)` real signals to truncated complex
//! coefficients `(..., lmax, mmax, 2)` with orthonormal scaling; the latitude
//! truncation keeps the first `ceil(lmax/2)` and last `floor(lmax/2)` rows so
//! both frequency signs around the centered cut survive. `InverseRealFft2`
//! synthesizes a real signal back on its own grid, which may differ from the
//! forward grid (up/downsampling).
//!
//! Both ops implement `bwd` with the exact adjoint of their forward map, so
//! gradients flow through the spectral domain during training:
//!
//! - adjoint of (ortho DFT2 + gather) is (scatter + unnormalized inverse DFT2,
//!   real part, same `1/sqrt(nlat*nlon)` scale), with no Hermitian doubling
//!   because each truncated coefficient is an independent (re, im) pair;
//! - adjoint of the inverse op is (unnormalized forward DFT2 + gather) with a
//!   factor 2 on every column that was Hermitian-mirrored during synthesis
//!   (all but DC and Nyquist).

use candle_core::{CpuStorage, CustomOp1, DType, Error, Layout, Shape, Tensor};
use harmonics_core::{HarmonicsError, Result};

use crate::fft::{dft2_in_place, hermitian_extend_row, truncated_rows, C32};
use crate::transform::SpectralTransform;

/// Forward truncated rfft2 of one `h x w` slice into `rows.len() * mmax`
/// complex pairs.
fn rfft2_slice(src: &[f32], h: usize, w: usize, rows: &[usize], mmax: usize, dst: &mut [f32]) {
    let scale = 1.0 / ((h * w) as f32).sqrt();
    let mut buf: Vec<C32> = src.iter().map(|&v| C32::new(v, 0.0)).collect();
    dft2_in_place(&mut buf, h, w, false);
    for (li, &r) in rows.iter().enumerate() {
        for m in 0..mmax {
            let c = buf[r * w + m];
            dst[(li * mmax + m) * 2] = c.re * scale;
            dst[(li * mmax + m) * 2 + 1] = c.im * scale;
        }
    }
}

/// Adjoint of `rfft2_slice`: scatter coefficients, inverse DFT2, real part.
fn rfft2_adjoint_slice(
    grad: &[f32],
    h: usize,
    w: usize,
    rows: &[usize],
    mmax: usize,
    dst: &mut [f32],
) {
    let scale = 1.0 / ((h * w) as f32).sqrt();
    let mut buf = vec![C32::new(0.0, 0.0); h * w];
    for (li, &r) in rows.iter().enumerate() {
        for m in 0..mmax {
            buf[r * w + m] = C32::new(grad[(li * mmax + m) * 2], grad[(li * mmax + m) * 2 + 1]);
        }
    }
    dft2_in_place(&mut buf, h, w, true);
    for i in 0..h * w {
        dst[i] = buf[i].re * scale;
    }
}

/// Inverse truncated rfft2 of `rows.len() * mmax` complex pairs onto an
/// `h x w` grid: column synthesis, per-row Hermitian extension, row synthesis.
fn irfft2_slice(coeffs: &[f32], h: usize, w: usize, rows: &[usize], mmax: usize, dst: &mut [f32]) {
    let scale = 1.0 / ((h * w) as f32).sqrt();
    let mut cols = vec![C32::new(0.0, 0.0); h * mmax];
    for (li, &r) in rows.iter().enumerate() {
        for m in 0..mmax {
            cols[r * mmax + m] =
                C32::new(coeffs[(li * mmax + m) * 2], coeffs[(li * mmax + m) * 2 + 1]);
        }
    }
    let mut col = vec![C32::new(0.0, 0.0); h];
    for m in 0..mmax {
        for r in 0..h {
            col[r] = cols[r * mmax + m];
        }
        crate::fft::fft_in_place(&mut col, true);
        for r in 0..h {
            cols[r * mmax + m] = col[r];
        }
    }
    let half = w / 2 + 1;
    let mut rowbuf = vec![C32::new(0.0, 0.0); w];
    for r in 0..h {
        rowbuf.iter_mut().for_each(|c| *c = C32::new(0.0, 0.0));
        for m in 0..mmax {
            rowbuf[m] = cols[r * mmax + m];
        }
        hermitian_extend_row(&mut rowbuf, half);
        crate::fft::fft_in_place(&mut rowbuf, true);
        for wi in 0..w {
            dst[r * w + wi] = rowbuf[wi].re * scale;
        }
    }
}

/// Adjoint of `irfft2_slice`: forward DFT2, gather, Hermitian doubling on
/// mirrored columns.
fn irfft2_adjoint_slice(
    grad: &[f32],
    h: usize,
    w: usize,
    rows: &[usize],
    mmax: usize,
    dst: &mut [f32],
) {
    let scale = 1.0 / ((h * w) as f32).sqrt();
    let mut buf: Vec<C32> = grad.iter().map(|&v| C32::new(v, 0.0)).collect();
    dft2_in_place(&mut buf, h, w, false);
    for (li, &r) in rows.iter().enumerate() {
        for m in 0..mmax {
            let doubling = if m == 0 || (w % 2 == 0 && m == w / 2) {
                1.0
            } else {
                2.0
            };
            let c = buf[r * w + m];
            dst[(li * mmax + m) * 2] = c.re * doubling * scale;
            dst[(li * mmax + m) * 2 + 1] = c.im * doubling * scale;
        }
    }
}

#[derive(Debug, Clone)]
struct Rfft2Op {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
}

impl CustomOp1 for Rfft2Op {
    fn name(&self) -> &'static str {
        "rfft2"
    }

    fn cpu_fwd(&self, storage: &CpuStorage, layout: &Layout) -> candle_core::Result<(CpuStorage, Shape)> {
        let data = storage.as_slice::<f32>()?;
        let data = match layout.contiguous_offsets() {
            Some((start, end)) => &data[start..end],
            None => return Err(Error::Msg("rfft2 expects a contiguous input".to_string())),
        };
        let (h, w) = (self.nlat, self.nlon);
        let dims = layout.shape().dims();
        if dims.len() < 2 || dims[dims.len() - 2] != h || dims[dims.len() - 1] != w {
            return Err(Error::Msg(format!(
                "rfft2 expects trailing dims ({h}, {w}), got {dims:?}"
            )));
        }
        let batch = layout.shape().elem_count() / (h * w);
        let rows = truncated_rows(h, self.lmax);
        let per_out = self.lmax * self.mmax * 2;

        let mut out = vec![0f32; batch * per_out];
        for b in 0..batch {
            rfft2_slice(
                &data[b * h * w..(b + 1) * h * w],
                h,
                w,
                &rows,
                self.mmax,
                &mut out[b * per_out..(b + 1) * per_out],
            );
        }

        let mut out_dims = dims[..dims.len() - 2].to_vec();
        out_dims.extend([self.lmax, self.mmax, 2]);
        Ok((CpuStorage::F32(out), Shape::from(out_dims)))
    }

    fn bwd(
        &self,
        arg: &Tensor,
        _res: &Tensor,
        grad_res: &Tensor,
    ) -> candle_core::Result<Option<Tensor>> {
        let g = grad_res.flatten_all()?.to_vec1::<f32>()?;
        let (h, w) = (self.nlat, self.nlon);
        let rows = truncated_rows(h, self.lmax);
        let per_in = self.lmax * self.mmax * 2;
        let batch = g.len() / per_in;

        let mut out = vec![0f32; batch * h * w];
        for b in 0..batch {
            rfft2_adjoint_slice(
                &g[b * per_in..(b + 1) * per_in],
                h,
                w,
                &rows,
                self.mmax,
                &mut out[b * h * w..(b + 1) * h * w],
            );
        }
        Ok(Some(Tensor::from_vec(out, arg.shape().clone(), arg.device())?))
    }
}

#[derive(Debug, Clone)]
struct Irfft2Op {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
}

impl CustomOp1 for Irfft2Op {
    fn name(&self) -> &'static str {
        "irfft2"
    }

    fn cpu_fwd(&self, storage: &CpuStorage, layout: &Layout) -> candle_core::Result<(CpuStorage, Shape)> {
        let data = storage.as_slice::<f32>()?;
        let data = match layout.contiguous_offsets() {
            Some((start, end)) => &data[start..end],
            None => return Err(Error::Msg("irfft2 expects a contiguous input".to_string())),
        };
        let (h, w) = (self.nlat, self.nlon);
        let dims = layout.shape().dims();
        let expect = [self.lmax, self.mmax, 2];
        if dims.len() < 3 || dims[dims.len() - 3..] != expect {
            return Err(Error::Msg(format!(
                "irfft2 expects trailing dims {expect:?}, got {dims:?}"
            )));
        }
        let per_in = self.lmax * self.mmax * 2;
        let batch = layout.shape().elem_count() / per_in;
        let rows = truncated_rows(h, self.lmax);

        let mut out = vec![0f32; batch * h * w];
        for b in 0..batch {
            irfft2_slice(
                &data[b * per_in..(b + 1) * per_in],
                h,
                w,
                &rows,
                self.mmax,
                &mut out[b * h * w..(b + 1) * h * w],
            );
        }

        let mut out_dims = dims[..dims.len() - 3].to_vec();
        out_dims.extend([h, w]);
        Ok((CpuStorage::F32(out), Shape::from(out_dims)))
    }

    fn bwd(
        &self,
        arg: &Tensor,
        _res: &Tensor,
        grad_res: &Tensor,
    ) -> candle_core::Result<Option<Tensor>> {
        let g = grad_res.flatten_all()?.to_vec1::<f32>()?;
        let (h, w) = (self.nlat, self.nlon);
        let rows = truncated_rows(h, self.lmax);
        let per_out = self.lmax * self.mmax * 2;
        let batch = g.len() / (h * w);

        let mut out = vec![0f32; batch * per_out];
        for b in 0..batch {
            irfft2_adjoint_slice(
                &g[b * h * w..(b + 1) * h * w],
                h,
                w,
                &rows,
                self.mmax,
                &mut out[b * per_out..(b + 1) * per_out],
            );
        }
        Ok(Some(Tensor::from_vec(out, arg.shape().clone(), arg.device())?))
    }
}

pub(crate) fn check_truncation(nlat: usize, nlon: usize, lmax: usize, mmax: usize) -> Result<()> {
    let mfold = nlon / 2 + 1;
    if lmax == 0 || mmax == 0 || lmax > nlat || mmax > mfold {
        return Err(HarmonicsError::TruncationOutOfRange {
            lmax,
            mmax,
            nlat,
            mfold,
        });
    }
    Ok(())
}

/// Forward band-limited real 2D Fourier transform.
#[derive(Debug, Clone)]
pub struct RealFft2 {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
}

impl RealFft2 {
    /// `lmax` defaults to `nlat`, `mmax` to `nlon/2 + 1` (no truncation).
    pub fn new(nlat: usize, nlon: usize, lmax: Option<usize>, mmax: Option<usize>) -> Result<Self> {
        let lmax = lmax.unwrap_or(nlat);
        let mmax = mmax.unwrap_or(nlon / 2 + 1);
        check_truncation(nlat, nlon, lmax, mmax)?;
        Ok(Self {
            nlat,
            nlon,
            lmax,
            mmax,
        })
    }
}

impl SpectralTransform for RealFft2 {
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
        Ok(x.apply_op1(Rfft2Op {
            nlat: self.nlat,
            nlon: self.nlon,
            lmax: self.lmax,
            mmax: self.mmax,
        })?)
    }
}

/// Inverse band-limited real 2D Fourier transform onto an `(nlat, nlon)` grid.
#[derive(Debug, Clone)]
pub struct InverseRealFft2 {
    nlat: usize,
    nlon: usize,
    lmax: usize,
    mmax: usize,
}

impl InverseRealFft2 {
    /// `lmax` defaults to `nlat`, `mmax` to `nlon/2 + 1` (no truncation).
    pub fn new(nlat: usize, nlon: usize, lmax: Option<usize>, mmax: Option<usize>) -> Result<Self> {
        let lmax = lmax.unwrap_or(nlat);
        let mmax = mmax.unwrap_or(nlon / 2 + 1);
        check_truncation(nlat, nlon, lmax, mmax)?;
        Ok(Self {
            nlat,
            nlon,
            lmax,
            mmax,
        })
    }
}

impl SpectralTransform for InverseRealFft2 {
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
        Ok(x.apply_op1(Irfft2Op {
            nlat: self.nlat,
            nlon: self.nlon,
            lmax: self.lmax,
            mmax: self.mmax,
        })?)
    }
}
