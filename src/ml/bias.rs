// ============================================================
// Layer 5 — Autoregressive Bias Tensor
// ============================================================
// Lifts the values from domain/bias.rs into a Burn tensor of
// shape (1, length, length). The leading 1 broadcasts over the
// batch when the bias meets the attention logits.
//
// The bias is a constant: it is created from plain data and
// detached, so no gradient ever flows into or through it.
//
// Burn's attention takes a boolean mask rather than an additive
// bias, so `bias_to_mask` marks every negative cell as masked
// and expands it to the batch.

use std::collections::HashMap;

use burn::{prelude::*, tensor::TensorData};

use crate::domain::bias::autoregressive_bias_values;
use crate::domain::error::BlockError;

/// Causal bias of shape (1, length, length).
pub fn autoregressive_bias<B: Backend>(
    length: usize,
    device: &B::Device,
) -> Result<Tensor<B, 3>, BlockError> {
    let values = autoregressive_bias_values(length)?;
    let data = TensorData::new(values, [1, length, length]);
    Ok(Tensor::<B, 3>::from_data(data, device).detach())
}

/// Boolean attention mask (batch, length, length), `true` where the
/// bias forbids attending.
pub fn bias_to_mask<B: Backend>(bias: Tensor<B, 3>, batch: usize) -> Tensor<B, 3, Bool> {
    let [_, rows, cols] = bias.dims();
    bias.lower_elem(0.0).expand([batch, rows, cols])
}

/// Memoises the causal bias per distinct length.
///
/// Tensors are reference counted, so handing out clones is cheap.
pub struct AutoregressiveBiasCache<B: Backend> {
    device:  B::Device,
    entries: HashMap<usize, Tensor<B, 3>>,
}

impl<B: Backend> AutoregressiveBiasCache<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, entries: HashMap::new() }
    }

    /// Bias for `length`, built on first request.
    pub fn get(&mut self, length: usize) -> Result<Tensor<B, 3>, BlockError> {
        if let Some(bias) = self.entries.get(&length) {
            return Ok(bias.clone());
        }
        let bias = autoregressive_bias::<B>(length, &self.device)?;
        tracing::debug!("Built autoregressive bias for length {}", length);
        self.entries.insert(length, bias.clone());
        Ok(bias)
    }

    /// Number of distinct lengths built so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
