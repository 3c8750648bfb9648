//! CLI command implementations.

pub mod ask;
pub mod config;
pub mod ingest;
pub mod init;
pub mod status;

use anyhow::{Context, Result};
use ragline_config::{AppPaths, Config};
use ragline_ingest::{initialize_engine, EngineHandle};
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// Settings resolved once per invocation and shared by every command.
pub struct CliContext {
    pub config: Config,
    /// File the configuration was layered from, if any location is known.
    pub config_file: Option<PathBuf>,
    pub working_dir: PathBuf,
}

impl CliContext {
    /// Resolve the config file and load defaults < file < environment.
    ///
    /// A config file that does not exist yet contributes nothing.
    pub fn load(working_dir: PathBuf, explicit_config: Option<PathBuf>) -> Result<Self> {
        let config_file = explicit_config.or_else(|| AppPaths::new().map(|p| p.config_file));
        let config = Config::load_layered(config_file.as_deref())
            .context("Failed to load configuration")?;

        Ok(Self {
            config,
            config_file,
            working_dir,
        })
    }

    /// Build and initialize the engine for this working directory.
    pub fn open_engine(&self, rt: &Runtime) -> Result<EngineHandle> {
        rt.block_on(initialize_engine(&self.config, &self.working_dir))
            .with_context(|| {
                format!(
                    "Failed to initialize engine in {}",
                    self.working_dir.display()
                )
            })
    }
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
