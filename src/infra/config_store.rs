// ============================================================
// Layer 6 — Config Store
// ============================================================
// Saves and restores the TransformerConfig as JSON so a model
// can be rebuilt with exactly the same architecture.
//
// File layout:
//   <dir>/
//     transformer_config.json   ← model hyperparameters
//
// A config is validated on load: a file with an unknown process
// step or a bad head count is rejected before any block is built.
//
// Reference: Rust Book §9 (Error Handling)
//            serde_json crate documentation

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::ml::config::TransformerConfig;

const CONFIG_FILE: &str = "transformer_config.json";

/// Reads and writes `transformer_config.json` in one directory.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Full path of the config file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Validate and write the config, creating the directory if needed.
    pub fn save(&self, cfg: &TransformerConfig) -> Result<()> {
        cfg.validate()
            .context("Refusing to save an invalid transformer config")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create config directory '{}'", self.dir.display()))?;

        let path = self.path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved transformer config to '{}'", path.display());
        Ok(())
    }

    /// Read and validate the config.
    pub fn load(&self) -> Result<TransformerConfig> {
        let path = self.path();
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Run 'init-config' first or pass a different --config-dir.",
                    path.display()
                )
            })?;

        let cfg: TransformerConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid config '{}'", path.display()))?;

        tracing::debug!("Loaded transformer config from '{}'", path.display());
        Ok(cfg)
    }

    /// Load the stored config, or fall back to `default` when there is none.
    pub fn load_or(&self, default: TransformerConfig) -> Result<TransformerConfig> {
        if self.exists() {
            self.load()
        } else {
            tracing::info!("No config at '{}', using defaults", self.path().display());
            default.validate()?;
            Ok(default)
        }
    }
}
