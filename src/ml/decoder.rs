// ============================================================
// Layer 5 — Decoder Block and Stack
// ============================================================
// A decoder block is the encoder pipeline with a cross-attention
// stage inserted between self-attention and feed-forward:
//
//   1. self-attention over the target, with the causal bias
//   2. attention from target queries to source keys/values
//   3. position-wise feed-forward
//
// Each stage is wrapped by pre/post process blocks exactly as in
// the encoder. The causal bias guarantees that the output at
// position i depends only on target positions 0..=i.

use burn::prelude::*;

use crate::domain::error::BlockError;
use crate::ml::{
    attention::{MultiHeadAttention, MultiHeadSelfAttention},
    bias::autoregressive_bias,
    config::TransformerConfig,
    feed_forward::FeedForward,
    process::ProcessBlock,
};

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub pre_self_attention:  ProcessBlock<B>,
    pub self_attention:      MultiHeadSelfAttention<B>,
    pub post_self_attention: ProcessBlock<B>,
    pub pre_enc_attention:   ProcessBlock<B>,
    pub enc_attention:       MultiHeadAttention<B>,
    pub post_enc_attention:  ProcessBlock<B>,
    pub pre_ff:              ProcessBlock<B>,
    pub feed_forward:        FeedForward<B>,
    pub post_ff:             ProcessBlock<B>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn new(config: &TransformerConfig, device: &B::Device) -> Result<Self, BlockError> {
        Ok(Self {
            pre_self_attention:  config.pre_process().init(device)?,
            self_attention:      MultiHeadSelfAttention::new(
                config.model_size,
                config.attention_heads,
                config.dropout_attention,
                device,
            ),
            post_self_attention: config.post_process().init(device)?,
            pre_enc_attention:   config.pre_process().init(device)?,
            enc_attention:       MultiHeadAttention::new(
                config.model_size,
                config.attention_heads,
                config.dropout_attention,
                device,
            ),
            post_enc_attention:  config.post_process().init(device)?,
            pre_ff:              config.pre_process().init(device)?,
            feed_forward:        config.feed_forward().init(device)?,
            post_ff:             config.post_process().init(device)?,
        })
    }

    /// target: (batch, target_length, model), source: (batch, source_length, model)
    /// target_bias: (1, target_length, target_length)
    #[allow(clippy::too_many_arguments)]
    pub fn forward(
        &self,
        target:         Tensor<B, 3>,
        target_lengths: Tensor<B, 1, Int>,
        target_length:  usize,
        target_bias:    Tensor<B, 3>,
        source:         Tensor<B, 3>,
        source_lengths: Tensor<B, 1, Int>,
        source_length:  usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        // self-attention
        let normed = self.pre_self_attention.forward(target.clone(), None, target_length)?;
        let attended = self.self_attention.forward(
            normed,
            target_lengths,
            target_length,
            Some(target_bias),
        )?;
        let target = self.post_self_attention.forward(attended, Some(target), target_length)?;

        // encoder attention
        let normed = self.pre_enc_attention.forward(target.clone(), None, target_length)?;
        let attended = self.enc_attention.forward(
            normed,
            target_length,
            source,
            source_lengths,
            source_length,
        )?;
        let target = self.post_enc_attention.forward(attended, Some(target), target_length)?;

        // feed-forward
        let normed = self.pre_ff.forward(target.clone(), None, target_length)?;
        let ff_out = self.feed_forward.forward(normed, target_length)?;
        self.post_ff.forward(ff_out, Some(target), target_length)
    }
}

#[derive(Module, Debug)]
pub struct TransformerDecoder<B: Backend> {
    pub layers:        Vec<DecoderBlock<B>>,
    pub final_process: ProcessBlock<B>,
}

impl<B: Backend> TransformerDecoder<B> {
    pub fn new(config: &TransformerConfig, device: &B::Device) -> Result<Self, BlockError> {
        let layers = (0..config.num_layers)
            .map(|_| DecoderBlock::new(config, device))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Built decoder: {} layers", layers.len());
        Ok(Self {
            layers,
            final_process: config.pre_process().init(device)?,
        })
    }

    /// Run every layer with a causal bias built for `target_length`.
    pub fn forward(
        &self,
        target:         Tensor<B, 3>,
        target_lengths: Tensor<B, 1, Int>,
        target_length:  usize,
        source:         Tensor<B, 3>,
        source_lengths: Tensor<B, 1, Int>,
        source_length:  usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        let bias = autoregressive_bias::<B>(target_length, &target.device())?;
        self.forward_with_bias(
            target,
            target_lengths,
            target_length,
            bias,
            source,
            source_lengths,
            source_length,
        )
    }

    /// Same as `forward`, with a bias supplied by the caller (e.g. from
    /// an `AutoregressiveBiasCache`). The one bias is shared by all layers.
    #[allow(clippy::too_many_arguments)]
    pub fn forward_with_bias(
        &self,
        target:         Tensor<B, 3>,
        target_lengths: Tensor<B, 1, Int>,
        target_length:  usize,
        target_bias:    Tensor<B, 3>,
        source:         Tensor<B, 3>,
        source_lengths: Tensor<B, 1, Int>,
        source_length:  usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        let mut target = target;
        for layer in &self.layers {
            target = layer.forward(
                target,
                target_lengths.clone(),
                target_length,
                target_bias.clone(),
                source.clone(),
                source_lengths.clone(),
                source_length,
            )?;
        }
        self.final_process.forward(target, None, target_length)
    }
}
