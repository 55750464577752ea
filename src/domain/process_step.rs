// ============================================================
// Layer 3 — Process Steps
// ============================================================
// A pre/post-process sequence is a short instruction string
// read left to right:
//
//   n — layer normalisation over the feature axis
//   r — residual connection (add the sublayer's input back)
//   d — dropout
//
// Common settings:
//   pre  = "n",  post = "dr"  → pre-norm transformer
//   pre  = "",   post = "drn" → post-norm transformer (Vaswani et al.)
//
// The string is parsed once, when a block is built, into a
// Vec<ProcessStep>. The forward pass then walks the enum
// values and never touches the string again.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Rust Book §6 (Enums and Pattern Matching)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::BlockError;

/// One operation of a process sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStep {
    /// `r`: elementwise sum with the previous tensor
    Residual,
    /// `n`: layer normalisation
    Normalize,
    /// `d`: dropout (a no-op when the rate is 0)
    Dropout,
}

impl ProcessStep {
    /// Map a sequence character to its step, or `None` if unknown.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(ProcessStep::Residual),
            'n' => Some(ProcessStep::Normalize),
            'd' => Some(ProcessStep::Dropout),
            _ => None,
        }
    }

    /// The character this step is written as.
    pub fn as_char(self) -> char {
        match self {
            ProcessStep::Residual => 'r',
            ProcessStep::Normalize => 'n',
            ProcessStep::Dropout => 'd',
        }
    }
}

impl fmt::Display for ProcessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parse a process sequence string into its ordered steps.
///
/// The empty string is valid and yields no steps.
///
/// # Example
/// ```
/// use transformer_blocks::domain::process_step::{parse_sequence, ProcessStep};
///
/// let steps = parse_sequence("dr").unwrap();
/// assert_eq!(steps, vec![ProcessStep::Dropout, ProcessStep::Residual]);
/// ```
pub fn parse_sequence(sequence: &str) -> Result<Vec<ProcessStep>, BlockError> {
    sequence
        .chars()
        .map(|c| {
            ProcessStep::from_char(c).ok_or_else(|| BlockError::UnknownStep {
                step: c,
                sequence: sequence.to_string(),
            })
        })
        .collect()
}

/// Render steps back into their sequence string.
pub fn sequence_string(steps: &[ProcessStep]) -> String {
    steps.iter().map(|s| s.as_char()).collect()
}

/// True if any step needs a previous tensor.
pub fn requires_previous(steps: &[ProcessStep]) -> bool {
    steps.contains(&ProcessStep::Residual)
}

/// True if any step needs a layer normalisation.
pub fn requires_norm(steps: &[ProcessStep]) -> bool {
    steps.contains(&ProcessStep::Normalize)
}
