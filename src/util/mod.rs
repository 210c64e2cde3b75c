//! Helpers that don't belong to the filter engine itself, chiefly tap design.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MathError {
    #[error("Math error: Type conversion from generic failed")]
    ConvertError,
    #[error("Math error: sample rate must be positive")]
    InvalidSampleRate,
    #[error("Math error: cutoff must be on interval (0.0, sample_rate / 2]")]
    InvalidCutoff,
    #[error("Math error: transition width must be positive")]
    InvalidTransitionWidth,
}

/// Filter design functions
pub mod math;
