//! Configuration for the sluice CLI.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use sluice_core::config::{ChainConfig, MetricsConfig, load_yaml, parse_yaml};
use sluice_core::error::{ConfigError, ZeroWorkersSnafu};

#[derive(Parser, Debug)]
#[command(version, about = "Transform stdin lines through an operator chain")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Emit lines in input order regardless of the config file
    #[arg(long)]
    pub ordered: bool,
}

impl CliArgs {
    /// Load the configured file (or defaults) and apply command-line overrides.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_path(path)?,
            None => AppConfig::default(),
        };
        if self.ordered {
            config.chain.ordered = true;
        }
        Ok(config)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config: Self = load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        ensure!(self.transform.workers > 0, ZeroWorkersSnafu);
        if self.metrics.enabled {
            self.metrics.socket_addr()?;
        }
        Ok(())
    }
}

/// The per-line transformation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default)]
    pub kind: TransformKind,
    /// Lines transformed concurrently (default: 4).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            kind: TransformKind::default(),
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Upper,
    Lower,
    Reverse,
    #[default]
    Trim,
}

impl TransformKind {
    pub fn apply(self, line: String) -> String {
        match self {
            TransformKind::Upper => line.to_uppercase(),
            TransformKind::Lower => line.to_lowercase(),
            TransformKind::Reverse => line.chars().rev().collect(),
            TransformKind::Trim => line.trim().to_string(),
        }
    }
}
