//! Pointwise two-layer feed-forward block.

use candle_core::{DType, Device, Module, Tensor, Var};
use candle_nn::{Activation, Conv2d, Conv2dConfig, Dropout};
use harmonics_core::{HarmonicsError, Result};
use tracing::debug;

/// Configuration for [`Mlp`]. `hidden_features` and `out_features` default to
/// `in_features`; `gain` scales the variance of the second projection. The
/// second projection is bias-free unless `output_bias` is set.
#[derive(Debug, Clone)]
pub struct MlpConfig {
    pub in_features: usize,
    pub hidden_features: Option<usize>,
    pub out_features: Option<usize>,
    pub activation: Activation,
    pub gain: f64,
    pub drop_rate: f32,
    pub output_bias: bool,
    pub checkpointing: bool,
}

impl MlpConfig {
    pub fn new(in_features: usize) -> Self {
        Self {
            in_features,
            hidden_features: None,
            out_features: None,
            activation: Activation::Relu,
            gain: 1.0,
            drop_rate: 0.0,
            output_bias: false,
            checkpointing: false,
        }
    }
}

/// Two 1x1 convolutions with an activation in between, operating on
/// `(batch, channel, h, w)` signals. Weights are fan-in scaled at
/// construction: `std = sqrt(2 / in_features)` for the first projection and
/// `std = sqrt(gain / hidden_features)` for the second; biases, where
/// present, start at zero.
pub struct Mlp {
    fc1: Conv2d,
    fc2: Conv2d,
    activation: Activation,
    dropout: Option<Dropout>,
    params: Vec<Var>,
}

impl Mlp {
    pub fn new(config: MlpConfig, device: &Device) -> Result<Self> {
        if config.checkpointing {
            return Err(HarmonicsError::CheckpointingUnsupported);
        }
        let in_f = config.in_features;
        let hidden_f = config.hidden_features.unwrap_or(in_f);
        let out_f = config.out_features.unwrap_or(in_f);

        let std1 = (2.0 / in_f as f64).sqrt();
        let std2 = (config.gain / hidden_f as f64).sqrt();

        let w1 = Var::from_tensor(&Tensor::randn(
            0f32,
            std1 as f32,
            (hidden_f, in_f, 1, 1),
            device,
        )?)?;
        let b1 = Var::zeros(hidden_f, DType::F32, device)?;
        let w2 = Var::from_tensor(&Tensor::randn(
            0f32,
            std2 as f32,
            (out_f, hidden_f, 1, 1),
            device,
        )?)?;
        let b2 = if config.output_bias {
            Some(Var::zeros(out_f, DType::F32, device)?)
        } else {
            None
        };

        let cfg = Conv2dConfig::default();
        let fc1 = Conv2d::new(w1.as_tensor().clone(), Some(b1.as_tensor().clone()), cfg);
        let fc2 = Conv2d::new(
            w2.as_tensor().clone(),
            b2.as_ref().map(|b| b.as_tensor().clone()),
            cfg,
        );

        let dropout = if config.drop_rate > 0.0 {
            Some(Dropout::new(config.drop_rate))
        } else {
            None
        };

        debug!(
            in_features = in_f,
            hidden_features = hidden_f,
            out_features = out_f,
            drop_rate = config.drop_rate,
            "built mlp"
        );

        let mut params = vec![w1, b1, w2];
        if let Some(b2) = b2 {
            params.push(b2);
        }

        Ok(Self {
            fc1,
            fc2,
            activation: config.activation,
            dropout,
            params,
        })
    }

    pub fn parameters(&self) -> Vec<&Var> {
        self.params.iter().collect()
    }

    pub fn forward(&self, x: &Tensor, training: bool) -> Result<Tensor> {
        let mut x = self.activation.forward(&self.fc1.forward(x)?)?;
        if let Some(drop) = &self.dropout {
            x = drop.forward(&x, training)?;
        }
        let mut x = self.fc2.forward(&x)?;
        if let Some(drop) = &self.dropout {
            x = drop.forward(&x, training)?;
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mapping() -> Result<()> {
        let device = Device::Cpu;
        let cfg = MlpConfig {
            hidden_features: Some(16),
            out_features: Some(6),
            ..MlpConfig::new(4)
        };
        let mlp = Mlp::new(cfg, &device)?;
        let x = Tensor::randn(0f32, 1f32, (2, 4, 8, 8), &device)?;
        let y = mlp.forward(&x, false)?;
        assert_eq!(y.dims(), &[2, 6, 8, 8]);
        Ok(())
    }

    #[test]
    fn test_defaults_preserve_features() -> Result<()> {
        let device = Device::Cpu;
        let mlp = Mlp::new(MlpConfig::new(5), &device)?;
        let x = Tensor::randn(0f32, 1f32, (1, 5, 4, 4), &device)?;
        let y = mlp.forward(&x, true)?;
        assert_eq!(y.dims(), &[1, 5, 4, 4]);
        Ok(())
    }

    #[test]
    fn test_checkpointing_rejected() {
        let cfg = MlpConfig {
            checkpointing: true,
            ..MlpConfig::new(4)
        };
        assert!(matches!(
            Mlp::new(cfg, &Device::Cpu),
            Err(HarmonicsError::CheckpointingUnsupported)
        ));
    }

    #[test]
    fn test_second_projection_bias_free_by_default() -> Result<()> {
        let device = Device::Cpu;
        let mlp = Mlp::new(MlpConfig::new(3), &device)?;
        let params = mlp.parameters();
        assert_eq!(params.len(), 3, "fc2 must carry no bias unless requested");
        for v in params[1].flatten_all()?.to_vec1::<f32>()? {
            assert_eq!(v, 0.0);
        }

        // A zero input maps to exactly zero without an output bias.
        let x = Tensor::zeros((1, 3, 2, 2), DType::F32, &device)?;
        let y = mlp.forward(&x, false)?;
        for v in y.flatten_all()?.to_vec1::<f32>()? {
            assert_eq!(v, 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_output_bias_opt_in_starts_zero() -> Result<()> {
        let device = Device::Cpu;
        let cfg = MlpConfig {
            output_bias: true,
            ..MlpConfig::new(3)
        };
        let mlp = Mlp::new(cfg, &device)?;
        let params = mlp.parameters();
        assert_eq!(params.len(), 4);
        for var in [params[1], params[3]] {
            for v in var.flatten_all()?.to_vec1::<f32>()? {
                assert_eq!(v, 0.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_pointwise_independence() -> Result<()> {
        // 1x1 convolutions must not mix spatial positions.
        let device = Device::Cpu;
        let mlp = Mlp::new(MlpConfig::new(2), &device)?;
        let mut data = vec![0f32; 2 * 4 * 4];
        data[0] = 1.0;
        let x = Tensor::from_vec(data, (1, 2, 4, 4), &device)?;
        let y = mlp.forward(&x, false)?;
        let cols = y.reshape((2, 16))?.to_vec2::<f32>()?;
        // All positions except (0,0) share the zero-input response.
        for ch in &cols {
            for i in 2..16 {
                assert!((ch[i] - ch[1]).abs() < 1e-6);
            }
        }
        Ok(())
    }
}
