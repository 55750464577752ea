// ============================================================
// Layer 5 — Shape Checks
// ============================================================
// Every block works on (batch, length, model_size) tensors and
// is told `length` explicitly. These checks turn a mismatch into
// a BlockError before Burn gets a chance to panic on a reshape.

use burn::prelude::*;

use crate::domain::error::BlockError;

/// Check that `tensor` is (batch, `length`, `model_size`).
pub(crate) fn check_sequence<B: Backend>(
    tensor:     &Tensor<B, 3>,
    length:     usize,
    model_size: usize,
) -> Result<(), BlockError> {
    let [_, got_length, got_size] = tensor.dims();
    if got_length != length {
        return Err(BlockError::LengthMismatch { expected: length, got: got_length });
    }
    if got_size != model_size {
        return Err(BlockError::ModelSizeMismatch { expected: model_size, got: got_size });
    }
    Ok(())
}

/// Check that the causal bias is (1, `length`, `length`).
pub(crate) fn check_bias<B: Backend>(bias: &Tensor<B, 3>, length: usize) -> Result<(), BlockError> {
    let [_, rows, cols] = bias.dims();
    if rows != length {
        return Err(BlockError::LengthMismatch { expected: length, got: rows });
    }
    if cols != length {
        return Err(BlockError::LengthMismatch { expected: length, got: cols });
    }
    Ok(())
}
