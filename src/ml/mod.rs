// ============================================================
// Layer 5 — ML / Block Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// The domain layer describes steps and bias values; this layer
// turns them into modules and tensors.
//
// What's in this layer:
//
//   config.rs       — TransformerConfig, shared read-only by
//                     every block built from it
//   process.rs      — the `n`/`r`/`d` pre/post-process block
//   feed_forward.rs — position-wise FFN (Linear → ReLU → Linear)
//   attention.rs    — self- and cross-attention adapters over
//                     Burn's MultiHeadAttention
//   bias.rs         — causal bias tensor, mask conversion, cache
//   encoder.rs      — EncoderBlock and the encoder stack
//   decoder.rs      — DecoderBlock and the decoder stack
//   shape.rs        — shape checks shared by the blocks
//
// Every forward pass returns Result<Tensor, BlockError>.
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod config;

pub mod process;

pub mod feed_forward;

pub mod attention;

pub mod bias;

pub mod encoder;

pub mod decoder;

mod shape;
