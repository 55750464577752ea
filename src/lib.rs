//! Encoder and decoder blocks of a sequence-to-sequence Transformer,
//! built on Burn.
//!
//! Each sublayer (self-attention, encoder attention, feed-forward) is
//! wrapped by configurable pre/post process blocks written as a short
//! `n`/`r`/`d` sequence: normalise, residual, dropout.

pub mod application;
pub mod domain;
pub mod infra;
pub mod ml;

pub use domain::error::BlockError;
pub use ml::config::TransformerConfig;
