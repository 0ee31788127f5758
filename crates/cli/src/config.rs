//! Configuration management for the CLI

use anyhow::{Context, Result};
use report_lib::{DefaultsPolicy, DEFAULT_REPORT_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;
use crate::Cli;

/// Environment variable prefix, e.g. `K8S_REPORTER_OUTPUT`
const ENV_PREFIX: &str = "K8S_REPORTER";

/// Values read from the config file and environment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterConfig {
    /// Default workbook path
    pub output: Option<PathBuf>,
    /// Default stdout format
    pub format: Option<OutputFormat>,
    /// Default namespace
    pub namespace: Option<String>,
    /// Default policy for failed namespace default lookups
    pub on_default_error: Option<DefaultsPolicy>,
}

impl ReporterConfig {
    /// Load configuration from the default file and the environment
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::load_sources(None),
        }
    }

    /// Load configuration from a specific file and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_sources(Some(path))
    }

    fn load_sources(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir()
            .map(|home| home.join(".config").join("k8s-reporter").join("config.json"))
    }
}

/// Effective settings for one run; flags take precedence over configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub namespace: Option<String>,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub policy: DefaultsPolicy,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: ReporterConfig) -> Self {
        Self {
            namespace: cli.namespace.clone().or(config.namespace),
            output: cli
                .output
                .clone()
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE)),
            format: cli.format.or(config.format).unwrap_or_default(),
            policy: cli
                .on_default_error
                .or(config.on_default_error)
                .unwrap_or_default(),
        }
    }
}
