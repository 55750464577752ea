// ============================================================
// Layer 5 — Encoder Block and Stack
// ============================================================
// One encoder block is a fixed pipeline of two sublayers, each
// wrapped by a pre- and a post-process block:
//
//   normed   = pre_self_attention(data)
//   attended = self_attention(normed, lengths)
//   data     = post_self_attention(attended, previous = data)
//
//   normed   = pre_ff(data)
//   ff_out   = feed_forward(normed)
//   data     = post_ff(ff_out, previous = data)
//
// The stack runs `num_layers` blocks and a final process block
// with the pre-process sequence, so a pre-norm stack hands a
// normalised representation to whatever consumes it.
//
// Reference: Vaswani et al. (2017) §3.1
//            Wang et al. (2019) Learning Deep Transformer Models

use burn::prelude::*;

use crate::domain::error::BlockError;
use crate::ml::{
    attention::MultiHeadSelfAttention,
    config::TransformerConfig,
    feed_forward::FeedForward,
    process::ProcessBlock,
};

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub pre_self_attention:  ProcessBlock<B>,
    pub self_attention:      MultiHeadSelfAttention<B>,
    pub post_self_attention: ProcessBlock<B>,
    pub pre_ff:              ProcessBlock<B>,
    pub feed_forward:        FeedForward<B>,
    pub post_ff:             ProcessBlock<B>,
}

impl<B: Backend> EncoderBlock<B> {
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
            pre_ff:              config.pre_process().init(device)?,
            feed_forward:        config.feed_forward().init(device)?,
            post_ff:             config.post_process().init(device)?,
        })
    }

    /// data: (batch, length, model), data_lengths: (batch) → (batch, length, model)
    pub fn forward(
        &self,
        data:         Tensor<B, 3>,
        data_lengths: Tensor<B, 1, Int>,
        length:       usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        // self-attention
        let normed = self.pre_self_attention.forward(data.clone(), None, length)?;
        let attended = self.self_attention.forward(normed, data_lengths, length, None)?;
        let data = self.post_self_attention.forward(attended, Some(data), length)?;

        // feed-forward
        let normed = self.pre_ff.forward(data.clone(), None, length)?;
        let ff_out = self.feed_forward.forward(normed, length)?;
        self.post_ff.forward(ff_out, Some(data), length)
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub layers:        Vec<EncoderBlock<B>>,
    pub final_process: ProcessBlock<B>,
}

impl<B: Backend> TransformerEncoder<B> {
    pub fn new(config: &TransformerConfig, device: &B::Device) -> Result<Self, BlockError> {
        let layers = (0..config.num_layers)
            .map(|_| EncoderBlock::new(config, device))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "Built encoder: {} layers, pre={:?} post={:?}",
            layers.len(),
            config.preprocess_sequence,
            config.postprocess_sequence,
        );
        Ok(Self {
            layers,
            final_process: config.pre_process().init(device)?,
        })
    }

    pub fn forward(
        &self,
        data:         Tensor<B, 3>,
        data_lengths: Tensor<B, 1, Int>,
        length:       usize,
    ) -> Result<Tensor<B, 3>, BlockError> {
        let mut data = data;
        for layer in &self.layers {
            data = layer.forward(data, data_lengths.clone(), length)?;
        }
        self.final_process.forward(data, None, length)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn config() -> TransformerConfig {
        TransformerConfig::new(16, 4, 32, 2, 50)
            .with_dropout_attention(0.0)
            .with_dropout_relu(0.0)
            .with_dropout_prepost(0.0)
    }

    #[test]
    fn test_block_keeps_shape() {
        let device = Default::default();
        let block: EncoderBlock<TestBackend> = config().init_encoder_block(&device).unwrap();
        let x = Tensor::random([3, 6, 16], Distribution::Normal(0.0, 1.0), &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([6, 4, 1], &device);
        let y = block.forward(x, lengths, 6).unwrap();
        assert_eq!(y.dims(), [3, 6, 16]);
    }

    #[test]
    fn test_block_is_deterministic_without_dropout() {
        let device = Default::default();
        let block: EncoderBlock<TestBackend> = config().init_encoder_block(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::random([2, 5, 16], Distribution::Normal(0.0, 1.0), &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([5, 3], &device);

        let a = block.forward(x.clone(), lengths.clone(), 5).unwrap();
        let b = block.forward(x, lengths, 5).unwrap();
        assert_eq!(
            a.into_data().to_vec::<f32>().unwrap(),
            b.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_post_norm_sequences() {
        // post-norm layout (Vaswani et al.): no pre-processing, "drn" after
        let device = Default::default();
        let cfg = config()
            .with_preprocess_sequence(String::new())
            .with_postprocess_sequence("drn".to_string());
        let encoder: TransformerEncoder<TestBackend> = cfg.init_encoder(&device).unwrap();
        assert_eq!(encoder.layers.len(), 2);
        assert!(encoder.final_process.steps().is_empty());

        let x = Tensor::random([1, 4, 16], Distribution::Normal(0.0, 1.0), &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([4], &device);
        let y = encoder.forward(x, lengths, 4).unwrap();
        assert_eq!(y.dims(), [1, 4, 16]);
    }

    #[test]
    fn test_stack_rejects_wrong_length() {
        let device = Default::default();
        let encoder: TransformerEncoder<TestBackend> = config().init_encoder(&device).unwrap();
        let x = Tensor::zeros([1, 4, 16], &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([4], &device);
        assert_eq!(
            encoder.forward(x, lengths, 3).unwrap_err(),
            BlockError::LengthMismatch { expected: 3, got: 4 }
        );
    }

    #[test]
    fn test_invalid_config_builds_nothing() {
        let device = Default::default();
        let cfg = config().with_postprocess_sequence("dx".to_string());
        let result: Result<TransformerEncoder<TestBackend>, _> = cfg.init_encoder(&device);
        assert!(matches!(result, Err(BlockError::UnknownStep { step: 'x', .. })));
    }
}
