// ============================================================
// Layer 5 — Position-wise Feed-Forward Network
// ============================================================
// FFN(x) = W2 · ReLU(W1 · x + b1) + b2, applied to every
// position independently:
//
//   (batch, length, model)            input
//   (batch·length, model)             flatten positions
//   (batch·length, hidden)            i2h projection + ReLU
//                                     dropout (only if rate > 0)
//   (batch·length, model)             h2o projection
//   (batch, length, model)            restore
//
// The two Linear layers own the weights and biases; they persist
// for the lifetime of the model and are trained by whatever
// optimiser the caller runs.
//
// Reference: Vaswani et al. (2017) §3.3

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::BlockError;
use crate::ml::{config::check_dropout, shape::check_sequence};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    /// Inner width (d_ff)
    pub num_hidden: usize,
    /// Outer width (d_model)
    pub num_model: usize,
    /// Dropout after the ReLU
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FeedForward<B>, BlockError> {
        check_dropout("dropout_relu", self.dropout)?;
        Ok(FeedForward {
            i2h:       LinearConfig::new(self.num_model, self.num_hidden).init(device),
            h2o:       LinearConfig::new(self.num_hidden, self.num_model).init(device),
            dropout:   (self.dropout > 0.0).then(|| DropoutConfig::new(self.dropout).init()),
            num_model: self.num_model,
        })
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub i2h:   Linear<B>,
    pub h2o:   Linear<B>,
    dropout:   Option<Dropout>,
    num_model: usize,
}

impl<B: Backend> FeedForward<B> {
    /// x: (batch, length, num_model) → (batch, length, num_model)
    pub fn forward(&self, x: Tensor<B, 3>, length: usize) -> Result<Tensor<B, 3>, BlockError> {
        check_sequence(&x, length, self.num_model)?;
        let [batch, _, _] = x.dims();

        let x = x.reshape([batch * length, self.num_model]);
        let h = relu(self.i2h.forward(x));
        let h = match &self.dropout {
            Some(dropout) => dropout.forward(h),
            None => h,
        };
        let y = self.h2o.forward(h);
        Ok(y.reshape([batch, length, self.num_model]))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_output_shape_matches_input() {
        let device = Default::default();
        for (batch, length, model, hidden) in [(1, 1, 4, 8), (2, 7, 16, 64), (5, 3, 8, 8)] {
            let ff: FeedForward<TestBackend> =
                FeedForwardConfig::new(hidden, model, 0.1).init(&device).unwrap();
            let x = Tensor::random([batch, length, model], Distribution::Default, &device);
            let y = ff.forward(x, length).unwrap();
            assert_eq!(y.dims(), [batch, length, model]);
        }
    }

    #[test]
    fn test_positions_are_independent() {
        // changing position 2 must not move the output at positions 0 and 1
        let device = Default::default();
        let ff: FeedForward<TestBackend> =
            FeedForwardConfig::new(32, 8, 0.0).init(&device).unwrap();
        let a = Tensor::<TestBackend, 3>::random([1, 3, 8], Distribution::Default, &device);
        let noise = Tensor::<TestBackend, 3>::random([1, 1, 8], Distribution::Default, &device);
        let b = a.clone().slice_assign([0..1, 2..3, 0..8], noise);

        let ya = ff.forward(a, 3).unwrap().slice([0..1, 0..2, 0..8]);
        let yb = ff.forward(b, 3).unwrap().slice([0..1, 0..2, 0..8]);
        let ya = ya.into_data().to_vec::<f32>().unwrap();
        let yb = yb.into_data().to_vec::<f32>().unwrap();
        for (a, b) in ya.iter().zip(&yb) {
            assert!((a - b).abs() < 1e-6, "{a} != {b}");
        }
    }

    #[test]
    fn test_zero_rate_builds_no_dropout() {
        let ff: FeedForward<TestBackend> =
            FeedForwardConfig::new(16, 8, 0.0).init(&Default::default()).unwrap();
        assert!(ff.dropout.is_none());
    }

    #[test]
    fn test_model_size_mismatch() {
        let device = Default::default();
        let ff: FeedForward<TestBackend> =
            FeedForwardConfig::new(16, 8, 0.0).init(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([1, 2, 6], &device);
        assert_eq!(
            ff.forward(x, 2).unwrap_err(),
            BlockError::ModelSizeMismatch { expected: 8, got: 6 }
        );
    }
}
