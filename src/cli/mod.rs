// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `forward`     — build encoder/decoder stacks and run a
//                      random batch through them
//   2. `bias`        — print the causal bias for a length
//   3. `init-config` — write a transformer config JSON
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BiasArgs, Commands, ForwardArgs, InitConfigArgs};

use transformer_blocks::application::{bias_use_case::BiasUseCase, forward_use_case::ForwardUseCase};
use transformer_blocks::infra::config_store::ConfigStore;

#[derive(Parser, Debug)]
#[command(
    name = "transformer-blocks",
    version = "0.1.0",
    about = "Transformer encoder/decoder blocks with n/r/d pre/post processing."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. This layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Forward(args)    => run_forward(args),
            Commands::Bias(args)       => run_bias(args),
            Commands::InitConfig(args) => run_init_config(args),
        }
    }
}

fn run_forward(args: ForwardArgs) -> Result<()> {
    tracing::info!("Running forward pass with config dir '{}'", args.config_dir);

    let fallback = args.model.clone().into();
    let report = ForwardUseCase::new(args.into(), fallback).execute()?;

    println!(
        "encoder: {} layers, output {:?}",
        report.encoder_layers, report.encoded_shape
    );
    println!(
        "decoder: {} layers, output {:?}",
        report.decoder_layers, report.decoded_shape
    );
    println!("source lengths: {:?}", report.source_lengths);
    println!("target lengths: {:?}", report.target_lengths);
    println!(
        "{} run(s) in {} ms, deterministic: {}",
        report.runs, report.elapsed_ms, report.deterministic
    );
    Ok(())
}

fn run_bias(args: BiasArgs) -> Result<()> {
    let text = BiasUseCase::new(args.length).render()?;
    println!("{text}");
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let store = ConfigStore::new(&args.config_dir);
    if store.exists() && !args.force {
        anyhow::bail!(
            "'{}' already exists, pass --force to overwrite",
            store.path().display()
        );
    }
    store.save(&args.model.into())?;
    println!("Config written to {}", store.path().display());
    Ok(())
}
