// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and their flags. Model
// hyperparameters are shared by `forward` (as the fallback when
// no config file exists) and `init-config`.

use clap::{Args, Subcommand};

use transformer_blocks::application::forward_use_case::ForwardSettings;
use transformer_blocks::ml::config::{PositionalEmbeddingType, TransformerConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build encoder and decoder stacks and run a random batch through them
    Forward(ForwardArgs),

    /// Print the causal (autoregressive) attention bias
    Bias(BiasArgs),

    /// Write a transformer config JSON
    InitConfig(InitConfigArgs),
}

/// Transformer hyperparameters
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Width of every token representation (d_model)
    #[arg(long, default_value_t = 64)]
    pub model_size: usize,

    /// Attention heads; must divide model_size
    #[arg(long, default_value_t = 4)]
    pub attention_heads: usize,

    /// Inner width of the feed-forward network
    #[arg(long, default_value_t = 256)]
    pub feed_forward_num_hidden: usize,

    /// Blocks per stack
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout_attention: f64,

    #[arg(long, default_value_t = 0.1)]
    pub dropout_relu: f64,

    #[arg(long, default_value_t = 0.1)]
    pub dropout_prepost: f64,

    /// Steps before each sublayer, over {n, r, d}
    #[arg(long, default_value = "n")]
    pub preprocess_sequence: String,

    /// Steps after each sublayer, over {n, r, d}
    #[arg(long, default_value = "dr")]
    pub postprocess_sequence: String,

    #[arg(long, default_value_t = 100)]
    pub max_seq_len_source: usize,

    #[arg(long, default_value_t = 100)]
    pub max_seq_len_target: usize,

    /// Use learned instead of fixed positional embeddings
    #[arg(long)]
    pub learned_positions: bool,

    #[arg(long)]
    pub weight_tying: bool,
}

impl From<ModelArgs> for TransformerConfig {
    fn from(a: ModelArgs) -> Self {
        let positions = if a.learned_positions {
            PositionalEmbeddingType::Learned
        } else {
            PositionalEmbeddingType::Fixed
        };
        TransformerConfig::new(
            a.model_size,
            a.attention_heads,
            a.feed_forward_num_hidden,
            a.num_layers,
            a.vocab_size,
        )
        .with_dropout_attention(a.dropout_attention)
        .with_dropout_relu(a.dropout_relu)
        .with_dropout_prepost(a.dropout_prepost)
        .with_preprocess_sequence(a.preprocess_sequence)
        .with_postprocess_sequence(a.postprocess_sequence)
        .with_max_seq_len_source(a.max_seq_len_source)
        .with_max_seq_len_target(a.max_seq_len_target)
        .with_positional_embedding_type(positions)
        .with_weight_tying(a.weight_tying)
    }
}

#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// Directory holding transformer_config.json; flags are used when absent
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Source positions per example
    #[arg(long, default_value_t = 12)]
    pub source_len: usize,

    /// Target positions per example
    #[arg(long, default_value_t = 10)]
    pub target_len: usize,

    /// Number of repeated passes over the same batch
    #[arg(long, default_value_t = 2)]
    pub runs: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<ForwardArgs> for ForwardSettings {
    fn from(a: ForwardArgs) -> Self {
        ForwardSettings {
            config_dir: a.config_dir,
            batch_size: a.batch_size,
            source_len: a.source_len,
            target_len: a.target_len,
            runs:       a.runs,
        }
    }
}

#[derive(Args, Debug)]
pub struct BiasArgs {
    /// Sequence length
    #[arg(long, default_value_t = 5)]
    pub length: usize,
}

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Directory to write transformer_config.json into
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}
