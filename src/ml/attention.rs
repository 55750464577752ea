// ============================================================
// Layer 5 — Attention Adapters
// ============================================================
// The blocks talk to attention through two small modules with
// the calling convention they need:
//
//   MultiHeadSelfAttention(data, lengths, length, bias)
//   MultiHeadAttention(query, query_length,
//                      memory, memory_lengths, memory_length)
//
// Both delegate to Burn's MultiHeadAttention. They only
// translate arguments:
//   - per-example lengths → key padding mask
//   - additive causal bias → boolean attention mask
//
// Reference: Vaswani et al. (2017) §3.2
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::attention::{self, MhaInput, MultiHeadAttentionConfig},
    prelude::*,
};

use crate::domain::error::BlockError;
use crate::ml::{
    bias::bias_to_mask,
    shape::{check_bias, check_sequence},
};

/// Key padding mask (batch, length): `true` at positions ≥ the
/// example's valid length.
pub fn padding_mask<B: Backend>(lengths: Tensor<B, 1, Int>, length: usize) -> Tensor<B, 2, Bool> {
    let [batch] = lengths.dims();
    let device = lengths.device();
    let positions = Tensor::<B, 1, Int>::arange(0..length as i64, &device)
        .unsqueeze::<2>()
        .expand([batch, length]);
    let lengths = lengths.unsqueeze_dim::<2>(1).expand([batch, length]);
    positions.greater_equal(lengths)
}

fn mha_config(model_size: usize, heads: usize, dropout: f64) -> MultiHeadAttentionConfig {
    MultiHeadAttentionConfig::new(model_size, heads).with_dropout(dropout)
}

// ─── Self-attention ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiHeadSelfAttention<B: Backend> {
    inner:      attention::MultiHeadAttention<B>,
    model_size: usize,
}

impl<B: Backend> MultiHeadSelfAttention<B> {
    pub fn new(model_size: usize, heads: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            inner: mha_config(model_size, heads, dropout).init(device),
            model_size,
        }
    }

    /// data: (batch, length, model) → (batch, length, model)
    ///
    /// `bias`, when given, is (1, length, length); cells below zero are
    /// never attended to.
    pub fn forward(
        &self,
        data:    Tensor<B, 3>,
        lengths: Tensor<B, 1, Int>,
        length:  usize,
        bias:    Option<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 3>, BlockError> {
        check_sequence(&data, length, self.model_size)?;
        let [batch, _, _] = data.dims();

        let mut input = MhaInput::self_attn(data).mask_pad(padding_mask(lengths, length));
        if let Some(bias) = bias {
            check_bias(&bias, length)?;
            input = input.mask_attn(bias_to_mask(bias, batch));
        }
        Ok(self.inner.forward(input).context)
    }
}

// ─── Cross-attention ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    inner:      attention::MultiHeadAttention<B>,
    model_size: usize,
}

impl<B: Backend> MultiHeadAttention<B> {
    pub fn new(model_size: usize, heads: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            inner: mha_config(model_size, heads, dropout).init(device),
            model_size,
        }
    }

    /// Queries from `query`, keys and values from `memory`.
    /// Output keeps the query shape (batch, query_length, model).
    pub fn forward(
        &self,
        query:          Tensor<B, 3>,
        query_length:   usize,
        memory:         Tensor<B, 3>,
        memory_lengths: Tensor<B, 1, Int>,
        memory_length:  usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        check_sequence(&query, query_length, self.model_size)?;
        check_sequence(&memory, memory_length, self.model_size)?;

        let input = MhaInput::new(query, memory.clone(), memory)
            .mask_pad(padding_mask(memory_lengths, memory_length));
        Ok(self.inner.forward(input).context)
    }
}
