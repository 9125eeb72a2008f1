//! Core types shared across the candle-harmonics crates.
//!
//! Provides:
//! - Centralized error types via thiserror
//! - Logging initialization via tracing

pub mod error;
pub mod logging;

pub use error::{HarmonicsError, Result};
