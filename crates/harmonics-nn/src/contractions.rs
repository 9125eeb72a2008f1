//! Structured linear contractions in coefficient space.
//!
//! Coefficients and weights arrive packed as real tensors with a trailing
//! (re, im) axis; the contractions unpack them, run broadcast complex
//! multiplies with sums over the in-channel (and, for block-diagonal, the
//! source-mode) axes, and repack. Everything is built from ordinary candle
//! ops so gradients flow without custom backward passes.

use candle_core::Tensor;
use harmonics_core::{HarmonicsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cplx::CTensor;

/// Structure of the learned operator applied per spectral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorType {
    /// Independent complex scalar per (out, in, l, m).
    Diagonal,
    /// Full mode-mixing matrix over m within each latitude band l.
    BlockDiagonal,
    /// One scalar per (out, in, l), shared across all m. A convolution with a
    /// zonally symmetric kernel acts this way (Driscoll-Healy theorem).
    DriscollHealy,
}

impl OperatorType {
    /// Weight dimensions excluding the trailing (re, im) axis. Separable
    /// weights drop the leading out-channel axis.
    pub fn weight_dims(
        &self,
        in_channels: usize,
        out_channels: usize,
        modes_lat: usize,
        modes_lon: usize,
        separable: bool,
    ) -> Vec<usize> {
        let mut dims = if separable {
            vec![in_channels]
        } else {
            vec![out_channels, in_channels]
        };
        match self {
            OperatorType::Diagonal => dims.extend([modes_lat, modes_lon]),
            OperatorType::BlockDiagonal => dims.extend([modes_lat, modes_lon, modes_lon]),
            OperatorType::DriscollHealy => dims.push(modes_lat),
        }
        dims
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperatorType::Diagonal => "diagonal",
            OperatorType::BlockDiagonal => "block-diagonal",
            OperatorType::DriscollHealy => "driscoll-healy",
        };
        f.write_str(s)
    }
}

impl FromStr for OperatorType {
    type Err = HarmonicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "diagonal" => Ok(OperatorType::Diagonal),
            "block-diagonal" => Ok(OperatorType::BlockDiagonal),
            "driscoll-healy" => Ok(OperatorType::DriscollHealy),
            other => Err(HarmonicsError::UnknownOperatorType(other.to_string())),
        }
    }
}

/// Dispatch to the contraction matching `operator_type`.
///
/// `x` is `(batch, in, modes_lat, modes_lon, 2)`; the weight layout follows
/// [`OperatorType::weight_dims`]. Returns `(batch, out, modes_lat, modes_lon, 2)`
/// (`out == in` when separable).
pub fn contract(
    operator_type: OperatorType,
    x: &Tensor,
    weight: &Tensor,
    separable: bool,
) -> Result<Tensor> {
    match operator_type {
        OperatorType::Diagonal => contract_diagonal(x, weight, separable),
        OperatorType::BlockDiagonal => contract_blockdiag(x, weight, separable),
        OperatorType::DriscollHealy => contract_dhconv(x, weight, separable),
    }
}

/// out[b,o,l,m] = sum_i w[o,i,l,m] * x[b,i,l,m]
pub fn contract_diagonal(x: &Tensor, weight: &Tensor, separable: bool) -> Result<Tensor> {
    let xc = CTensor::from_packed(x)?;
    let wc = CTensor::from_packed(weight)?;
    let out = if separable {
        xc.broadcast_mul(&wc.unsqueeze(0)?)?
    } else {
        xc.unsqueeze(1)?
            .broadcast_mul(&wc.unsqueeze(0)?)?
            .sum(2)?
    };
    out.into_packed()
}

/// out[b,o,l,m] = sum_i sum_m' w[o,i,l,m,m'] * x[b,i,l,m']
pub fn contract_blockdiag(x: &Tensor, weight: &Tensor, separable: bool) -> Result<Tensor> {
    let xc = CTensor::from_packed(x)?;
    let wc = CTensor::from_packed(weight)?;
    let out = if separable {
        // x: (b,i,l,1,m'), w: (1,i,l,m,m'), sum over m'.
        xc.unsqueeze(3)?
            .broadcast_mul(&wc.unsqueeze(0)?)?
            .sum(4)?
    } else {
        // x: (b,1,i,l,1,m'), w: (1,o,i,l,m,m'), sum over m' then i.
        xc.unsqueeze(1)?
            .unsqueeze(4)?
            .broadcast_mul(&wc.unsqueeze(0)?)?
            .sum(5)?
            .sum(2)?
    };
    out.into_packed()
}

/// out[b,o,l,m] = sum_i w[o,i,l] * x[b,i,l,m]
pub fn contract_dhconv(x: &Tensor, weight: &Tensor, separable: bool) -> Result<Tensor> {
    let xc = CTensor::from_packed(x)?;
    let wc = CTensor::from_packed(weight)?;
    let out = if separable {
        // w: (1,i,l,1) broadcast across m.
        xc.broadcast_mul(&wc.unsqueeze(0)?.unsqueeze(3)?)?
    } else {
        // x: (b,1,i,l,m), w: (1,o,i,l,1), sum over i.
        xc.unsqueeze(1)?
            .broadcast_mul(&wc.unsqueeze(0)?.unsqueeze(4)?)?
            .sum(2)?
    };
    out.into_packed()
}
