// ============================================================
// Layer 3 — Autoregressive Bias Values
// ============================================================
// The causal bias is a (length × length) table added to the
// attention logits. Row i is the query position, column j the
// key position:
//
//   length = 4
//
//     0  B  B  B
//     0  0  B  B        B = AUTOREGRESSIVE_BIAS_VALUE
//     0  0  0  B
//     0  0  0  0
//
// Cells strictly above the diagonal (j > i) are large and
// negative, so after softmax position i puts no weight on any
// later position. The diagonal and everything below stay 0.
//
// This file only builds the numbers. ml/bias.rs turns them
// into a (1, length, length) tensor.

use crate::domain::error::BlockError;

/// Value written into masked (future) cells. Large enough to drive
/// the post-softmax weight to zero, small enough to stay finite in f32.
pub const AUTOREGRESSIVE_BIAS_VALUE: f32 = -99_999_999.0;

/// Row-major (length × length) causal bias.
pub fn autoregressive_bias_values(length: usize) -> Result<Vec<f32>, BlockError> {
    if length == 0 {
        return Err(BlockError::EmptySequence);
    }
    let mut values = vec![0.0f32; length * length];
    for row in 0..length {
        for col in (row + 1)..length {
            values[row * length + col] = AUTOREGRESSIVE_BIAS_VALUE;
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_triangle_is_masked() {
        for length in [1usize, 2, 5, 16] {
            let values = autoregressive_bias_values(length).unwrap();
            assert_eq!(values.len(), length * length);
            for i in 0..length {
                for j in 0..length {
                    let v = values[i * length + j];
                    if i < j {
                        assert_eq!(v, AUTOREGRESSIVE_BIAS_VALUE, "cell ({i},{j})");
                    } else {
                        assert_eq!(v, 0.0, "cell ({i},{j})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_length_one_is_zero() {
        assert_eq!(autoregressive_bias_values(1).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert_eq!(autoregressive_bias_values(0), Err(BlockError::EmptySequence));
    }
}
