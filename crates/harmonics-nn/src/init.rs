//! Parameter initialization helpers.

use candle_core::{Device, Shape, Tensor, Var};
use harmonics_core::Result;
use rand::Rng;
use std::f64::consts::SQRT_2;
use tracing::warn;

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / SQRT_2))
}

/// Inverse error function, Giles (2012) polynomial approximation. Accurate to
/// single precision over (-1, 1), which is all the sampling below needs.
fn erfinv(x: f64) -> f64 {
    let w = -((1.0 - x) * (1.0 + x)).ln();
    let mut p;
    if w < 5.0 {
        let w = w - 2.5;
        p = 2.810_226_36e-08;
        p = 3.432_739_39e-07 + p * w;
        p = -3.523_387_7e-06 + p * w;
        p = -4.391_506_54e-06 + p * w;
        p = 0.000_218_580_87 + p * w;
        p = -0.001_253_725_03 + p * w;
        p = -0.004_177_681_64 + p * w;
        p = 0.246_640_727 + p * w;
        p = 1.501_409_41 + p * w;
    } else {
        let w = w.sqrt() - 3.0;
        p = -0.000_200_214_257;
        p = 0.000_100_950_558 + p * w;
        p = 0.001_349_343_22 + p * w;
        p = -0.003_673_428_44 + p * w;
        p = 0.005_739_507_73 + p * w;
        p = -0.007_622_461_3 + p * w;
        p = 0.009_438_870_47 + p * w;
        p = 1.001_674_06 + p * w;
        p = 2.832_976_82 + p * w;
    }
    p * x
}

/// Sample an F32 tensor from a normal distribution with the given mean and
/// std, truncated to `[a, b]`.
///
/// Values are generated by drawing uniformly from the CDF image of `[a, b]`
/// and pushing through the inverse normal CDF, then clamped. Warns (without
/// failing) when the mean lies more than two std outside the bounds, where
/// the approximation degrades.
pub fn trunc_normal<S: Into<Shape>>(
    shape: S,
    mean: f64,
    std: f64,
    a: f64,
    b: f64,
    device: &Device,
) -> Result<Tensor> {
    if mean < a - 2.0 * std || mean > b + 2.0 * std {
        warn!(
            mean,
            std,
            a,
            b,
            "trunc_normal mean is more than 2 std outside [a, b]; \
             the distribution of values may be incorrect"
        );
    }

    let l = norm_cdf((a - mean) / std);
    let u = norm_cdf((b - mean) / std);
    let lo = 2.0 * l - 1.0;
    let hi = 2.0 * u - 1.0;

    let shape: Shape = shape.into();
    let n = shape.elem_count();
    let mut rng = rand::thread_rng();
    let mut data = Vec::with_capacity(n);
    for _ in 0..n {
        let t = lo + (hi - lo) * rng.gen::<f64>();
        let v = (erfinv(t) * std * SQRT_2 + mean).clamp(a, b);
        data.push(v as f32);
    }
    Ok(Tensor::from_vec(data, shape, device)?)
}

/// Overwrite `var` in place with truncated-normal samples.
pub fn trunc_normal_(var: &Var, mean: f64, std: f64, a: f64, b: f64) -> Result<()> {
    let t = trunc_normal(var.shape().clone(), mean, std, a, b, var.device())?;
    var.set(&t)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_samples_within_bounds() -> Result<()> {
        let t = trunc_normal((64, 64), 0.0, 1.0, -0.5, 0.25, &Device::Cpu)?;
        let vals = t.flatten_all()?.to_vec1::<f32>()?;
        for &v in &vals {
            assert!((-0.5..=0.25).contains(&v), "out of bounds: {}", v);
        }
        Ok(())
    }

    #[test]
    fn test_wide_bounds_match_moments() -> Result<()> {
        let (mean, std) = (0.3f64, 0.7f64);
        let t = trunc_normal((200, 200), mean, std, -20.0, 20.0, &Device::Cpu)?;
        let vals = t.flatten_all()?.to_vec1::<f32>()?;
        let n = vals.len() as f64;
        let emp_mean: f64 = vals.iter().map(|&v| v as f64).sum::<f64>() / n;
        let emp_var: f64 =
            vals.iter().map(|&v| (v as f64 - emp_mean).powi(2)).sum::<f64>() / n;
        assert!(
            (emp_mean - mean).abs() < 0.02,
            "empirical mean {} vs {}",
            emp_mean,
            mean
        );
        assert!(
            (emp_var.sqrt() - std).abs() < 0.02,
            "empirical std {} vs {}",
            emp_var.sqrt(),
            std
        );
        Ok(())
    }

    #[test]
    fn test_erfinv_roundtrip() {
        for &x in &[-1.5f64, -0.3, 0.0, 0.2, 0.9, 2.1] {
            let t = libm::erf(x);
            assert!((erfinv(t) - x).abs() < 1e-5, "erfinv(erf({})) drifted", x);
        }
    }

    #[test]
    fn test_in_place_fill() -> Result<()> {
        let var = Var::zeros((8, 8), candle_core::DType::F32, &Device::Cpu)?;
        trunc_normal_(&var, 0.0, 0.02, -2.0, 2.0)?;
        let vals = var.flatten_all()?.to_vec1::<f32>()?;
        assert!(vals.iter().any(|&v| v != 0.0), "fill left the buffer zeroed");
        Ok(())
    }

    #[test]
    fn test_far_mean_still_clamps() -> Result<()> {
        // Mean far outside the interval: warned, not fatal; samples clamp.
        let t = trunc_normal((32,), 10.0, 1.0, -1.0, 1.0, &Device::Cpu)?;
        let vals = t.flatten_all()?.to_vec1::<f32>()?;
        for &v in &vals {
            assert!((-1.0..=1.0).contains(&v));
        }
        Ok(())
    }
}
