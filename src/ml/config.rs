// ============================================================
// Layer 5 — Transformer Configuration
// ============================================================
// One immutable bundle of hyperparameters shared by every
// block of an encoder/decoder stack. It is built once (from
// CLI flags or a JSON file) and only ever read afterwards:
// blocks receive `&TransformerConfig` and copy out what they
// need at construction time.
//
// Burn's #[derive(Config)] gives us:
//   - a `new(..)` constructor for the required fields
//   - `with_*` builders for every defaulted field
//   - JSON `save` / `load`
//
// Reference: Burn Book §3 (Config)
//            Vaswani et al. (2017) Table 3 (base model)

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::error::BlockError;
use crate::domain::process_step::{parse_sequence, requires_previous, ProcessStep};
use crate::ml::{
    decoder::{DecoderBlock, TransformerDecoder},
    encoder::{EncoderBlock, TransformerEncoder},
    feed_forward::FeedForwardConfig,
    process::ProcessBlockConfig,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    /// Width of every token representation (d_model)
    pub model_size: usize,
    /// Number of attention heads; must divide model_size
    pub attention_heads: usize,
    /// Inner width of the position-wise feed-forward network
    pub feed_forward_num_hidden: usize,
    /// Number of stacked blocks in the encoder and in the decoder
    pub num_layers: usize,
    pub vocab_size: usize,
    /// Dropout on attention weights
    #[config(default = 0.1)]
    pub dropout_attention: f64,
    /// Dropout after the feed-forward ReLU
    #[config(default = 0.1)]
    pub dropout_relu: f64,
    /// Dropout used by the `d` step of pre/post-process sequences
    #[config(default = 0.1)]
    pub dropout_prepost: f64,
    #[config(default = false)]
    pub weight_tying: bool,
    #[config(default = "PositionalEmbeddingType::Fixed")]
    pub positional_embedding_type: PositionalEmbeddingType,
    /// Steps applied before every sublayer
    #[config(default = "String::from(\"n\")")]
    pub preprocess_sequence: String,
    /// Steps applied after every sublayer
    #[config(default = "String::from(\"dr\")")]
    pub postprocess_sequence: String,
    #[config(default = 100)]
    pub max_seq_len_source: usize,
    #[config(default = 100)]
    pub max_seq_len_target: usize,
    /// Character-level convolutional source embedding, when used
    pub conv_config: Option<ConvolutionalEmbeddingConfig>,
}

/// How positions are encoded before the first block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionalEmbeddingType {
    /// Sinusoidal, not learned
    Fixed,
    /// A learned embedding per position
    Learned,
    /// No positional information
    None,
}

/// Convolutional embedding over source characters (Lee et al. 2017).
/// Carried as part of the model description; the embedding itself
/// lives outside the blocks.
#[derive(Config, Debug)]
pub struct ConvolutionalEmbeddingConfig {
    pub num_embed: usize,
    pub output_dim: usize,
    #[config(default = 8)]
    pub max_filter_width: usize,
    #[config(default = "vec![200, 200, 250, 250, 300, 300, 300, 300]")]
    pub num_filters: Vec<usize>,
    #[config(default = 5)]
    pub pool_stride: usize,
    #[config(default = 4)]
    pub num_highway_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
    #[config(default = false)]
    pub add_positional_encoding: bool,
}

impl ConvolutionalEmbeddingConfig {
    /// One filter count per width 1..=max_filter_width, and a sane dropout.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.num_filters.len() != self.max_filter_width {
            return Err(BlockError::FilterCountMismatch {
                expected: self.max_filter_width,
                got: self.num_filters.len(),
            });
        }
        check_dropout("conv_config.dropout", self.dropout)
    }
}

impl TransformerConfig {
    /// Check every invariant the blocks rely on.
    ///
    /// Called before any block is built so a bad config fails
    /// at construction, never halfway through a forward pass.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.attention_heads == 0 || self.model_size % self.attention_heads != 0 {
            return Err(BlockError::InvalidHeads {
                heads:      self.attention_heads,
                model_size: self.model_size,
            });
        }
        check_dropout("dropout_attention", self.dropout_attention)?;
        check_dropout("dropout_relu", self.dropout_relu)?;
        check_dropout("dropout_prepost", self.dropout_prepost)?;

        // pre-processing never has a previous tensor to add back
        if requires_previous(&self.preprocess_steps()?) {
            return Err(BlockError::ResidualWithoutPrevious {
                sequence: self.preprocess_sequence.clone(),
            });
        }
        self.postprocess_steps()?;

        if let Some(conv) = &self.conv_config {
            conv.validate()?;
        }
        Ok(())
    }

    pub fn preprocess_steps(&self) -> Result<Vec<ProcessStep>, BlockError> {
        parse_sequence(&self.preprocess_sequence)
    }

    pub fn postprocess_steps(&self) -> Result<Vec<ProcessStep>, BlockError> {
        parse_sequence(&self.postprocess_sequence)
    }

    /// Config of the block that runs before a sublayer.
    pub fn pre_process(&self) -> ProcessBlockConfig {
        ProcessBlockConfig::new(
            self.preprocess_sequence.clone(),
            self.model_size,
            self.dropout_prepost,
        )
    }

    /// Config of the block that runs after a sublayer.
    pub fn post_process(&self) -> ProcessBlockConfig {
        ProcessBlockConfig::new(
            self.postprocess_sequence.clone(),
            self.model_size,
            self.dropout_prepost,
        )
    }

    pub fn feed_forward(&self) -> FeedForwardConfig {
        FeedForwardConfig::new(self.feed_forward_num_hidden, self.model_size, self.dropout_relu)
    }

    pub fn init_encoder_block<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<EncoderBlock<B>, BlockError> {
        EncoderBlock::new(self, device)
    }

    pub fn init_decoder_block<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<DecoderBlock<B>, BlockError> {
        DecoderBlock::new(self, device)
    }

    /// Validate, then build a stack of `num_layers` encoder blocks.
    pub fn init_encoder<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<TransformerEncoder<B>, BlockError> {
        self.validate()?;
        TransformerEncoder::new(self, device)
    }

    /// Validate, then build a stack of `num_layers` decoder blocks.
    pub fn init_decoder<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<TransformerDecoder<B>, BlockError> {
        self.validate()?;
        TransformerDecoder::new(self, device)
    }
}

pub(crate) fn check_dropout(name: &str, rate: f64) -> Result<(), BlockError> {
    if (0.0..1.0).contains(&rate) {
        Ok(())
    } else {
        Err(BlockError::InvalidDropout { name: name.to_string(), rate })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TransformerConfig {
        TransformerConfig::new(16, 4, 32, 2, 100)
    }

    #[test]
    fn test_defaults_are_pre_norm() {
        let cfg = base();
        assert_eq!(cfg.preprocess_sequence, "n");
        assert_eq!(cfg.postprocess_sequence, "dr");
        assert_eq!(cfg.positional_embedding_type, PositionalEmbeddingType::Fixed);
        assert!(cfg.conv_config.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_heads_must_divide_model_size() {
        let cfg = TransformerConfig::new(10, 4, 32, 2, 100);
        assert_eq!(
            cfg.validate(),
            Err(BlockError::InvalidHeads { heads: 4, model_size: 10 })
        );
        let cfg = TransformerConfig::new(16, 0, 32, 2, 100);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_dropout_range() {
        let cfg = base().with_dropout_relu(1.0);
        assert!(matches!(cfg.validate(), Err(BlockError::InvalidDropout { .. })));
        let cfg = base().with_dropout_prepost(-0.1);
        assert!(matches!(cfg.validate(), Err(BlockError::InvalidDropout { .. })));
        let cfg = base().with_dropout_attention(0.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unknown_step_fails_validation() {
        let cfg = base().with_postprocess_sequence("dz".to_string());
        assert!(matches!(cfg.validate(), Err(BlockError::UnknownStep { step: 'z', .. })));
    }

    #[test]
    fn test_residual_in_preprocess_is_rejected() {
        let cfg = base().with_preprocess_sequence("nr".to_string());
        assert!(matches!(
            cfg.validate(),
            Err(BlockError::ResidualWithoutPrevious { .. })
        ));
    }

    #[test]
    fn test_conv_config_filter_count() {
        let conv = ConvolutionalEmbeddingConfig::new(32, 64);
        assert!(conv.validate().is_ok());
        let cfg = base().with_conv_config(Some(conv.with_max_filter_width(3)));
        assert_eq!(
            cfg.validate(),
            Err(BlockError::FilterCountMismatch { expected: 3, got: 8 })
        );
    }

    #[test]
    fn test_json_round_trip_keeps_sequences() {
        let cfg = base()
            .with_preprocess_sequence(String::new())
            .with_postprocess_sequence("drn".to_string())
            .with_positional_embedding_type(PositionalEmbeddingType::Learned);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"learned\""));
        let back: TransformerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.postprocess_sequence, "drn");
        assert_eq!(back.preprocess_sequence, "");
        assert_eq!(back.positional_embedding_type, PositionalEmbeddingType::Learned);
    }
}
