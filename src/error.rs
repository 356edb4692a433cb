//! Crate-wide error type.
//!
//! Only malformed input is an error. Empty collections, empty concept memory
//! and searches where nothing clears a threshold return empty results, and
//! divergence between the two energies is a classified state in
//! [`crate::stability::StabilityReport`], not a failure.

use thiserror::Error;

/// Root error type for all resonance-core failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResonanceError {
    /// Two patterns (or a pattern and a space) disagree on bit width.
    #[error("dimension mismatch: expected {expected} bits, found {found}")]
    DimensionMismatch {
        /// Width required by the operation.
        expected: usize,
        /// Width of the offending operand.
        found: usize,
    },

    /// A bit index does not fit the pattern width.
    #[error("bit index {index} out of range for dimension {dim}")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Pattern width.
        dim: usize,
    },

    /// Affective component with a weight outside [0, 1] or a non-finite phase.
    #[error("invalid affective component '{label}': weight={weight}, phase={phase}")]
    InvalidComponent {
        /// Component label.
        label: String,
        /// Supplied weight.
        weight: f64,
        /// Supplied phase.
        phase: f64,
    },

    /// Packed pattern whose word count or trailing bits disagree with its width.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Feature value that is negative or not finite.
    #[error("invalid feature {dim}: {value}")]
    InvalidFeature {
        /// Feature name.
        dim: &'static str,
        /// Supplied value.
        value: f64,
    },

    /// Phase rotation requested with a non-finite angle.
    #[error("invalid phase: {0}")]
    InvalidPhase(f64),

    /// Configuration failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// The external generation capability failed.
    #[error("generator error: {0}")]
    Generation(String),

    /// A persisted concept memory could not be restored.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Result alias used throughout the crate.
pub type ResonanceResult<T> = Result<T, ResonanceError>;
