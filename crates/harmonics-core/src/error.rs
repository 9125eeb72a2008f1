//! Centralized error types for candle-harmonics.
//!
//! Uses thiserror for ergonomic error handling with context. All variants
//! except `Candle` are configuration errors raised at construction time;
//! none of them are retryable.

use thiserror::Error;

/// Main error type for candle-harmonics operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarmonicsError {
    /// Operator type string did not name a known contraction structure.
    #[error("unknown operator type: {0:?} (expected \"diagonal\", \"block-diagonal\" or \"driscoll-healy\")")]
    UnknownOperatorType(String),

    /// Factorization string did not name a known decomposition.
    #[error("unknown factorization: {0:?} (expected \"dense\", \"cp\" or \"tucker\", with optional \"complex\" prefix)")]
    UnknownFactorization(String),

    /// Grid string did not name a known latitudinal sampling.
    #[error("unknown grid type: {0:?} (expected \"equiangular\" or \"legendre-gauss\")")]
    UnknownGridType(String),

    /// Checkpointed (recompute-to-save-memory) execution was requested.
    #[error("checkpointed execution is not supported")]
    CheckpointingUnsupported,

    /// Forward and inverse transforms disagree on the spectral truncation.
    #[error("transform truncation mismatch: forward (lmax={forward_lmax}, mmax={forward_mmax}) vs inverse (lmax={inverse_lmax}, mmax={inverse_mmax})")]
    TruncationMismatch {
        forward_lmax: usize,
        forward_mmax: usize,
        inverse_lmax: usize,
        inverse_mmax: usize,
    },

    /// Requested mode truncation is empty or exceeds what the grid
    /// resolution supports.
    #[error("spectral truncation out of range: lmax={lmax} outside 1..={nlat} (nlat) or mmax={mmax} outside 1..={mfold} (nlon/2+1)")]
    TruncationOutOfRange {
        lmax: usize,
        mmax: usize,
        nlat: usize,
        mfold: usize,
    },

    /// Separable operators apply one weight per channel and cannot remap
    /// channel counts.
    #[error("separable operator requires in_channels == out_channels, got {in_channels} and {out_channels}")]
    SeparableChannelMismatch {
        in_channels: usize,
        out_channels: usize,
    },

    /// Matern covariance is not trace-class for alpha <= 1, so sigma cannot
    /// be derived.
    #[error("matern regularity alpha must exceed 1 when sigma is derived, got {0}")]
    InvalidAlpha(f64),

    /// Factorization rank was zero, negative or otherwise unusable.
    #[error("invalid factorization rank: {0}")]
    InvalidRank(String),

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Candle tensor library error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, HarmonicsError>;

impl HarmonicsError {
    /// True for errors that indicate a misconfigured layer rather than a
    /// runtime tensor failure.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, HarmonicsError::Candle(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarmonicsError::TruncationMismatch {
            forward_lmax: 16,
            forward_mmax: 17,
            inverse_lmax: 8,
            inverse_mmax: 9,
        };
        assert!(err.to_string().contains("lmax=16"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_unknown_operator_type() {
        let err = HarmonicsError::UnknownOperatorType("banded".to_string());
        assert!(err.to_string().contains("banded"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_candle_error_not_config() {
        let err = HarmonicsError::Candle(candle_core::Error::Msg("boom".to_string()));
        assert!(!err.is_config_error());
    }
}
