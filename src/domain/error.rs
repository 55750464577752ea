// ============================================================
// Layer 3 — Block Errors
// ============================================================
// Every failure a block can report. None of these are
// transient: they are configuration or caller bugs, so they
// are propagated with `?` and never retried.
//
// Two families:
//   - Configuration errors, raised when a block is built or
//     first used with a malformed setup (unknown step, residual
//     without a previous tensor, bad dropout, bad head count)
//   - Precondition violations, raised when a tensor handed to
//     a block does not have the shape the block was told about
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use thiserror::Error;

/// Error type for block construction and forward passes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// A process sequence contains a character outside `{n, r, d}`.
    #[error("Unknown step in sequence {sequence:?}: {step:?}")]
    UnknownStep { step: char, sequence: String },

    /// The sequence asks for a residual connection but no previous
    /// tensor was supplied.
    #[error("Residual requested with no previous input (sequence {sequence:?})")]
    ResidualWithoutPrevious { sequence: String },

    /// The sequence axis of a tensor does not match the declared length.
    #[error("Length mismatch: expected sequence length {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// The feature axis of a tensor does not match the model size.
    #[error("Model size mismatch: expected {expected} features, got {got}")]
    ModelSizeMismatch { expected: usize, got: usize },

    /// The number of attention heads is zero or does not divide the model size.
    #[error("Invalid attention heads: {heads} heads for model size {model_size}")]
    InvalidHeads { heads: usize, model_size: usize },

    /// A dropout rate outside `[0, 1)`.
    #[error("Invalid dropout rate for {name}: {rate} (expected 0 <= rate < 1)")]
    InvalidDropout { name: String, rate: f64 },

    /// A zero-length sequence was requested where at least one position is needed.
    #[error("Sequence length must be at least 1")]
    EmptySequence,

    /// A normalisation step on a block that was built without a layer norm.
    #[error("Normalization step in sequence {sequence:?} but the block has no layer norm")]
    MissingNormalization { sequence: String },

    /// The convolutional embedding needs one filter count per filter width.
    #[error("Expected {expected} filter counts (one per width), got {got}")]
    FilterCountMismatch { expected: usize, got: usize },
}

impl BlockError {
    /// True for errors caused by a malformed configuration, as opposed
    /// to a tensor of the wrong shape.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            BlockError::LengthMismatch { .. } | BlockError::ModelSizeMismatch { .. }
        )
    }
}
