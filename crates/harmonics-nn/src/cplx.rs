//! Complex arithmetic over paired-real tensors.
//!
//! Parameter storage and autodiff here are real-valued, so complex arrays
//! travel as real tensors with a trailing size-2 axis. `CTensor` splits that
//! axis into separate re/im planes once, runs the arithmetic as ordinary real
//! broadcast ops (which candle differentiates natively), and packs the pair
//! back at the boundary.

use candle_core::{Tensor, D};
use harmonics_core::Result;

#[derive(Debug, Clone)]
pub(crate) struct CTensor {
    pub re: Tensor,
    pub im: Tensor,
}

impl CTensor {
    /// Split a packed `(..., 2)` tensor into re/im planes of shape `(...)`.
    pub fn from_packed(t: &Tensor) -> Result<Self> {
        let re = t.narrow(D::Minus1, 0, 1)?.squeeze(D::Minus1)?;
        let im = t.narrow(D::Minus1, 1, 1)?.squeeze(D::Minus1)?;
        Ok(Self { re, im })
    }

    /// Repack into the trailing-2-axis representation.
    pub fn into_packed(self) -> Result<Tensor> {
        Ok(Tensor::stack(&[&self.re, &self.im], D::Minus1)?)
    }

    pub fn dims(&self) -> &[usize] {
        self.re.dims()
    }

    /// Elementwise complex product with broadcasting.
    pub fn broadcast_mul(&self, rhs: &Self) -> Result<Self> {
        let re = (self.re.broadcast_mul(&rhs.re)? - self.im.broadcast_mul(&rhs.im)?)?;
        let im = (self.re.broadcast_mul(&rhs.im)? + self.im.broadcast_mul(&rhs.re)?)?;
        Ok(Self { re, im })
    }

    pub fn sum(&self, dim: usize) -> Result<Self> {
        Ok(Self {
            re: self.re.sum(dim)?,
            im: self.im.sum(dim)?,
        })
    }

    pub fn unsqueeze(&self, dim: usize) -> Result<Self> {
        Ok(Self {
            re: self.re.unsqueeze(dim)?,
            im: self.im.unsqueeze(dim)?,
        })
    }

    pub fn reshape(&self, dims: &[usize]) -> Result<Self> {
        Ok(Self {
            re: self.re.reshape(dims)?,
            im: self.im.reshape(dims)?,
        })
    }

    pub fn permute(&self, dims: &[usize]) -> Result<Self> {
        Ok(Self {
            re: self.re.permute(dims)?.contiguous()?,
            im: self.im.permute(dims)?.contiguous()?,
        })
    }

    /// Complex matrix product over the trailing two axes.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let re = (self.re.matmul(&rhs.re)? - self.im.matmul(&rhs.im)?)?;
        let im = (self.re.matmul(&rhs.im)? + self.im.matmul(&rhs.re)?)?;
        Ok(Self { re, im })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_pack_roundtrip() -> Result<()> {
        let device = Device::Cpu;
        let t = Tensor::randn(0f32, 1f32, (3, 4, 2), &device)?;
        let c = CTensor::from_packed(&t)?;
        assert_eq!(c.dims(), &[3, 4]);
        let back = c.into_packed()?;
        assert_eq!(
            t.flatten_all()?.to_vec1::<f32>()?,
            back.flatten_all()?.to_vec1::<f32>()?
        );
        Ok(())
    }

    #[test]
    fn test_complex_multiply() -> Result<()> {
        let device = Device::Cpu;
        // (1 + 2i) * (3 - i) = 5 + 5i
        let a = Tensor::from_vec(vec![1f32, 2.0], (1, 2), &device)?;
        let b = Tensor::from_vec(vec![3f32, -1.0], (1, 2), &device)?;
        let prod = CTensor::from_packed(&a)?
            .broadcast_mul(&CTensor::from_packed(&b)?)?
            .into_packed()?;
        let v = prod.flatten_all()?.to_vec1::<f32>()?;
        assert!((v[0] - 5.0).abs() < 1e-6 && (v[1] - 5.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_complex_matmul_against_scalar() -> Result<()> {
        let device = Device::Cpu;
        // 1x1 matrices reduce matmul to complex scalar multiply.
        let a = Tensor::from_vec(vec![2f32, 1.0], (1, 1, 2), &device)?;
        let b = Tensor::from_vec(vec![0f32, 1.0], (1, 1, 2), &device)?;
        let prod = CTensor::from_packed(&a)?
            .matmul(&CTensor::from_packed(&b)?)?
            .into_packed()?;
        // (2 + i) * i = -1 + 2i
        let v = prod.flatten_all()?.to_vec1::<f32>()?;
        assert!((v[0] + 1.0).abs() < 1e-6 && (v[1] - 2.0).abs() < 1e-6);
        Ok(())
    }
}
