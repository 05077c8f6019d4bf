//! Error types for the sluice CLI.

use snafu::prelude::*;

pub use sluice_core::error::{ChainError, ConfigError, MetricsError};

/// Top-level failure of a sluice run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// The metrics endpoint could not be started.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },

    /// The chain could not be built or failed while running.
    #[snafu(display("Chain error: {source}"))]
    Chain { source: ChainError },
}

impl From<ConfigError> for AppError {
    fn from(source: ConfigError) -> Self {
        AppError::Config { source }
    }
}

impl From<MetricsError> for AppError {
    fn from(source: MetricsError) -> Self {
        AppError::Metrics { source }
    }
}

impl From<ChainError> for AppError {
    fn from(source: ChainError) -> Self {
        AppError::Chain { source }
    }
}
