//! Matern Gaussian random fields on the sphere.

use candle_core::{DType, Device, Tensor, D};
use harmonics_core::{HarmonicsError, Result};
use harmonics_transforms::{GridType, InverseRealSht, SpectralTransform};
use tracing::debug;

/// Mean-zero Gaussian random field with Matern covariance
/// `C = sigma^2 (-Lap + tau^2 I)^(-alpha)` on the unit sphere (Lap is the
/// spherical Laplacian). Samples are drawn through a Karhunen-Loeve expansion
/// in the spherical-harmonic basis: white complex noise per (degree, order)
/// coefficient, scaled by the square root of the covariance eigenvalues,
/// synthesized by an inverse spherical-harmonic transform.
///
/// `C` is trace-class on the sphere iff `alpha > 1`, which is enforced when
/// `sigma` is derived rather than given.
pub struct GaussianRandomFieldS2 {
    nlat: usize,
    alpha: f64,
    tau: f64,
    sigma: f64,
    radius: f64,
    grid: GridType,
    isht: InverseRealSht,
    sqrt_eig: Tensor,
    dtype: DType,
    device: Device,
}

impl GaussianRandomFieldS2 {
    /// `nlat` latitudinal modes; the longitude count is fixed at `2 * nlat`.
    /// `sigma` defaults to `tau^(alpha - 1)`, which requires `alpha > 1`.
    pub fn new(
        nlat: usize,
        alpha: f64,
        tau: f64,
        sigma: Option<f64>,
        radius: f64,
        grid: GridType,
        device: &Device,
    ) -> Result<Self> {
        let sigma = match sigma {
            Some(s) => s,
            None => {
                if alpha <= 1.0 {
                    return Err(HarmonicsError::InvalidAlpha(alpha));
                }
                tau.powf(alpha - 1.0)
            }
        };

        let isht = InverseRealSht::new(nlat, 2 * nlat, None, None, grid)?;
        let sqrt_eig = sqrt_eig_table(nlat, alpha, tau, sigma, radius, device)?;

        debug!(nlat, alpha, tau, sigma, radius, "built gaussian random field");

        Ok(Self {
            nlat,
            alpha,
            tau,
            sigma,
            radius,
            grid,
            isht,
            sqrt_eig,
            dtype: DType::F32,
            device: device.clone(),
        })
    }

    pub fn nlat(&self) -> usize {
        self.nlat
    }

    /// Square root of the covariance eigenvalues, `(nlat, nlat + 1)`, lower
    /// triangular in (degree, order) with the constant mode zeroed.
    pub fn sqrt_eig(&self) -> &Tensor {
        &self.sqrt_eig
    }

    /// Draw `n` independent fields of shape `(n, nlat, 2 * nlat)`. When `xi`
    /// is given it is used verbatim as the complex noise, shaped
    /// `(..., nlat, nlat + 1, 2)`, and `n` is ignored; same noise, same field.
    pub fn sample(&self, n: usize, xi: Option<&Tensor>) -> Result<Tensor> {
        let xi = match xi {
            Some(xi) => {
                let dims = xi.dims();
                let expect = [self.nlat, self.nlat + 1, 2];
                if dims.len() < 3 || dims[dims.len() - 3..] != expect {
                    return Err(HarmonicsError::ShapeMismatch {
                        expected: expect.to_vec(),
                        actual: dims.to_vec(),
                    });
                }
                xi.to_dtype(DType::F32)?
            }
            None => Tensor::randn(
                0f32,
                1f32,
                (n, self.nlat, self.nlat + 1, 2),
                &self.device,
            )?,
        };

        let scaled = xi.broadcast_mul(&self.sqrt_eig.unsqueeze(D::Minus1)?)?;
        Ok(self.isht.forward(&scaled)?.to_dtype(self.dtype)?)
    }

    /// Move the sampler to another dtype/device, reconstructing the derived
    /// state (eigenvalue table and synthesis transform) rather than assuming
    /// buffers migrate on their own.
    pub fn rebind(&mut self, dtype: DType, device: &Device) -> Result<()> {
        self.sqrt_eig = sqrt_eig_table(
            self.nlat,
            self.alpha,
            self.tau,
            self.sigma,
            self.radius,
            device,
        )?;
        self.isht = InverseRealSht::new(self.nlat, 2 * self.nlat, None, None, self.grid)?;
        self.dtype = dtype;
        self.device = device.clone();
        Ok(())
    }
}

/// `sigma * (j(j+1)/radius^2 + tau^2)^(-alpha/2)` for degree j, broadcast over
/// orders m <= j; zero above the diagonal and at (0, 0).
fn sqrt_eig_table(
    nlat: usize,
    alpha: f64,
    tau: f64,
    sigma: f64,
    radius: f64,
    device: &Device,
) -> Result<Tensor> {
    let mmax = nlat + 1;
    let mut data = vec![0f32; nlat * mmax];
    for j in 0..nlat {
        let lap = (j * (j + 1)) as f64 / (radius * radius);
        let v = (sigma * (lap + tau * tau).powf(-alpha / 2.0)) as f32;
        for m in 0..=j {
            data[j * mmax + m] = v;
        }
    }
    data[0] = 0.0;
    Ok(Tensor::from_vec(data, (nlat, mmax), device)?)
}
