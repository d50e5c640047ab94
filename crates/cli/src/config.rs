//! CLI configuration: defaults, then optional file, then `CERTREG_*` environment.

use anyhow::{Context, Result};
use certreg_registry::RegistryConfig;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Directory holding the sled database
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Log line layout. Unknown values are rejected when the configuration loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("data_dir", "./certreg-data")?
            .set_default("log_level", "warn")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("CERTREG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}
