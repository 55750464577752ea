// ============================================================
// Layer 5 — Process Block
// ============================================================
// Wraps every sublayer on both sides. The block owns:
//
//   steps   — the parsed `n`/`r`/`d` sequence (never re-parsed)
//   norm    — a LayerNorm, only when the sequence contains `n`
//   dropout — a Dropout, only when the rate is > 0
//
// Forward pass, for each step in order:
//
//   r → data = data + previous
//   n → (batch, length, hidden) → (batch·length, hidden)
//       → LayerNorm → (batch, length, hidden)
//   d → dropout (skipped entirely when the rate is 0)
//
// An empty sequence returns the input untouched.
//
// Reference: Ba et al. (2016) Layer Normalization
//            Burn Book §3 (Building Blocks)

use burn::{
    module::Ignored,
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::domain::error::BlockError;
use crate::domain::process_step::{
    parse_sequence, requires_norm, requires_previous, sequence_string, ProcessStep,
};
use crate::ml::{config::check_dropout, shape::check_sequence};

#[derive(Config, Debug)]
pub struct ProcessBlockConfig {
    /// Steps to apply, e.g. "n" or "dr"
    pub sequence: String,
    /// Feature width of the tensors this block sees
    pub num_hidden: usize,
    /// Rate used by the `d` step
    pub dropout: f64,
}

impl ProcessBlockConfig {
    /// Parse the sequence and build the block.
    ///
    /// Fails on an unknown step or a dropout outside [0, 1).
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ProcessBlock<B>, BlockError> {
        let steps = parse_sequence(&self.sequence)?;
        check_dropout("dropout_prepost", self.dropout)?;

        let norm = requires_norm(&steps)
            .then(|| LayerNormConfig::new(self.num_hidden).init(device));
        let dropout = (self.dropout > 0.0)
            .then(|| DropoutConfig::new(self.dropout).init());

        Ok(ProcessBlock {
            steps: Ignored(steps),
            norm,
            dropout,
            num_hidden: self.num_hidden,
        })
    }
}

#[derive(Module, Debug)]
pub struct ProcessBlock<B: Backend> {
    steps:      Ignored<Vec<ProcessStep>>,
    norm:       Option<LayerNorm<B>>,
    dropout:    Option<Dropout>,
    num_hidden: usize,
}

impl<B: Backend> ProcessBlock<B> {
    /// Apply the sequence to `data` of shape (batch, length, num_hidden).
    ///
    /// `previous` is the sublayer input, needed only by `r`. If the
    /// sequence contains `r` and `previous` is `None` this fails before
    /// any step runs.
    pub fn forward(
        &self,
        data:     Tensor<B, 3>,
        previous: Option<Tensor<B, 3>>,
        length:   usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        if self.steps.0.is_empty() {
            return Ok(data);
        }
        if previous.is_none() && requires_previous(&self.steps.0) {
            return Err(self.residual_error());
        }

        let mut data = data;
        for step in self.steps.0.iter() {
            data = match step {
                ProcessStep::Residual => {
                    let previous = previous.as_ref().ok_or_else(|| self.residual_error())?;
                    check_sequence(previous, length, self.num_hidden)?;
                    data + previous.clone()
                }
                ProcessStep::Normalize => self.reshape_and_normalize(data, length)?,
                ProcessStep::Dropout => match &self.dropout {
                    Some(dropout) => dropout.forward(data),
                    None => data,
                },
            };
        }
        Ok(data)
    }

    /// The sequence this block was built from.
    pub fn sequence(&self) -> String {
        sequence_string(&self.steps.0)
    }

    pub fn steps(&self) -> &[ProcessStep] {
        &self.steps.0
    }

    /// Flatten batch and positions, normalise each row, restore the shape.
    fn reshape_and_normalize(
        &self,
        data:   Tensor<B, 3>,
        length: usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        let norm = self.norm.as_ref().ok_or_else(|| BlockError::MissingNormalization {
            sequence: self.sequence(),
        })?;
        check_sequence(&data, length, self.num_hidden)?;

        let [batch, _, _] = data.dims();
        let flat = data.reshape([batch * length, self.num_hidden]);
        let normed = norm.forward(flat);
        Ok(normed.reshape([batch, length, self.num_hidden]))
    }

    fn residual_error(&self) -> BlockError {
        BlockError::ResidualWithoutPrevious { sequence: self.sequence() }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn block(sequence: &str, dropout: f64) -> ProcessBlock<TestBackend> {
        ProcessBlockConfig::new(sequence.to_string(), 8, dropout)
            .init(&Default::default())
            .unwrap()
    }

    fn input(batch: usize, length: usize) -> Tensor<TestBackend, 3> {
        Tensor::random([batch, length, 8], Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_empty_sequence_is_identity() {
        let p = block("", 0.3);
        let x = input(2, 5);
        let y = p.forward(x.clone(), None, 5).unwrap();
        assert_eq!(values(x), values(y));
    }

    #[test]
    fn test_zero_rate_dropout_is_identity() {
        let p = block("d", 0.0);
        assert!(p.dropout.is_none());
        let x = input(3, 4);
        let y = p.forward(x.clone(), None, 4).unwrap();
        assert_eq!(values(x), values(y));
    }

    #[test]
    fn test_residual_without_previous_fails() {
        for sequence in ["r", "dr", "nr", "rnd", "drn"] {
            let p = block(sequence, 0.1);
            let err = p.forward(input(1, 3), None, 3).unwrap_err();
            assert_eq!(
                err,
                BlockError::ResidualWithoutPrevious { sequence: sequence.to_string() }
            );
        }
    }

    #[test]
    fn test_residual_adds_previous() {
        let p = block("r", 0.0);
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::ones([1, 2, 8], &device);
        let prev = Tensor::<TestBackend, 3>::ones([1, 2, 8], &device) * 2.0;
        let y = p.forward(data, Some(prev), 2).unwrap();
        assert!(values(y).iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_normalize_keeps_shape() {
        let p = block("n", 0.0);
        for length in [1usize, 8, 100] {
            let x = input(3, length);
            let count = x.dims().iter().product::<usize>();
            let y = p.forward(x, None, length).unwrap();
            assert_eq!(y.dims(), [3, length, 8]);
            assert_eq!(y.dims().iter().product::<usize>(), count);
        }
    }

    #[test]
    fn test_normalize_rows_have_zero_mean() {
        let p = block("n", 0.0);
        let y = p.forward(input(2, 4), None, 4).unwrap();
        let mean = values(y.mean_dim(2));
        assert!(mean.iter().all(|m| m.abs() < 1e-4), "row means: {mean:?}");
    }

    #[test]
    fn test_length_mismatch_is_reported() {
        let p = block("n", 0.0);
        let err = p.forward(input(2, 4), None, 5).unwrap_err();
        assert_eq!(err, BlockError::LengthMismatch { expected: 5, got: 4 });
    }

    #[test]
    fn test_unknown_step_fails_at_construction() {
        let result = ProcessBlockConfig::new("nq".to_string(), 8, 0.1)
            .init::<TestBackend>(&Default::default());
        assert!(matches!(result, Err(BlockError::UnknownStep { step: 'q', .. })));
    }

    #[test]
    fn test_norm_only_built_when_needed() {
        assert!(block("dr", 0.1).norm.is_none());
        assert!(block("n", 0.1).norm.is_some());
        assert_eq!(block("drn", 0.1).sequence(), "drn");
    }

    #[test]
    fn test_dropout_active_under_autodiff() {
        type Train = Autodiff<NdArray>;
        let p: ProcessBlock<Train> = ProcessBlockConfig::new("d".to_string(), 8, 0.5)
            .init(&Default::default())
            .unwrap();
        let x = Tensor::<Train, 3>::ones([4, 32, 8], &Default::default());
        let y = p.forward(x, None, 32).unwrap();
        let out = y.into_data().to_vec::<f32>().unwrap();
        // dropped cells are 0, kept cells are scaled by 1 / (1 - p)
        assert!(out.iter().any(|&v| v == 0.0));
        assert!(out.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
    }
}
