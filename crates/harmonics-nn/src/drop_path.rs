//! Stochastic depth (drop path) per sample.

use candle_core::Tensor;
use harmonics_core::Result;

/// Randomly zeroes whole samples of the batch during training, rescaling the
/// survivors by `1 / keep_prob` so the layer is the identity in expectation.
#[derive(Debug, Clone, Copy)]
pub struct DropPath {
    drop_prob: f64,
}

impl DropPath {
    pub fn new(drop_prob: f64) -> Self {
        Self { drop_prob }
    }

    pub fn drop_prob(&self) -> f64 {
        self.drop_prob
    }

    /// One keep/drop decision per batch element, broadcast over all other
    /// dimensions. Identity outside training or at zero probability.
    pub fn forward(&self, x: &Tensor, training: bool) -> Result<Tensor> {
        if self.drop_prob == 0.0 || !training {
            return Ok(x.clone());
        }
        if self.drop_prob >= 1.0 {
            // Degenerate case: keep_prob = 0 would divide by zero.
            return Ok(x.zeros_like()?);
        }
        let keep_prob = 1.0 - self.drop_prob;
        let mut mask_dims = vec![1usize; x.dims().len()];
        mask_dims[0] = x.dims()[0];
        let noise = Tensor::rand(0f32, 1f32, mask_dims, x.device())?.to_dtype(x.dtype())?;
        // floor(keep_prob + U[0,1)) binarizes to a Bernoulli(keep_prob) mask.
        let mask = (noise + keep_prob)?.floor()?;
        Ok(x.affine(1.0 / keep_prob, 0.0)?.broadcast_mul(&mask)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_identity_when_not_training() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::randn(0f32, 1f32, (4, 3, 8, 8), &device)?;
        let dp = DropPath::new(0.5);
        let y = dp.forward(&x, false)?;
        assert_eq!(
            x.flatten_all()?.to_vec1::<f32>()?,
            y.flatten_all()?.to_vec1::<f32>()?
        );
        Ok(())
    }

    #[test]
    fn test_identity_at_zero_probability() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::randn(0f32, 1f32, (2, 16), &device)?;
        let dp = DropPath::new(0.0);
        let y = dp.forward(&x, true)?;
        assert_eq!(
            x.flatten_all()?.to_vec1::<f32>()?,
            y.flatten_all()?.to_vec1::<f32>()?
        );
        Ok(())
    }

    #[test]
    fn test_full_drop_zeroes_output() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::randn(0f32, 1f32, (4, 8), &device)?;
        let dp = DropPath::new(1.0);
        let y = dp.forward(&x, true)?;
        for v in y.flatten_all()?.to_vec1::<f32>()? {
            assert_eq!(v, 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_whole_samples_kept_or_dropped() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::ones((8, 4, 4), candle_core::DType::F32, &device)?;
        let dp = DropPath::new(0.5);
        let y = dp.forward(&x, true)?;
        let rows = y.reshape((8, 16))?.to_vec2::<f32>()?;
        for row in rows {
            let first = row[0];
            assert!(first == 0.0 || (first - 2.0).abs() < 1e-6);
            for &v in &row {
                assert_eq!(v, first, "mask must be constant within a sample");
            }
        }
        Ok(())
    }

    #[test]
    fn test_mask_follows_input_dtype() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::ones((6, 4), candle_core::DType::F64, &device)?;
        let dp = DropPath::new(0.5);
        let y = dp.forward(&x, true)?;
        assert_eq!(y.dtype(), candle_core::DType::F64);
        for row in y.to_vec2::<f64>()? {
            assert!(row[0] == 0.0 || (row[0] - 2.0).abs() < 1e-9);
            for &v in &row {
                assert_eq!(v, row[0]);
            }
        }
        Ok(())
    }

    #[test]
    fn test_unbiased_in_expectation() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::ones((64, 2), candle_core::DType::F32, &device)?;
        let dp = DropPath::new(0.3);
        let trials = 200;
        let mut acc = 0f64;
        for _ in 0..trials {
            let y = dp.forward(&x, true)?;
            acc += y.mean_all()?.to_scalar::<f32>()? as f64;
        }
        let mean = acc / trials as f64;
        assert!(
            (mean - 1.0).abs() < 0.05,
            "expected value should approximate identity, got {}",
            mean
        );
        Ok(())
    }
}
