//! Error types for chain composition, lifecycle and configuration.
//!
//! Operator runtime failures live in [`crate::operator::OperatorError`]; the
//! types here cover everything the chain itself can reject.

use snafu::prelude::*;

use crate::operator::OperatorError;

// ============ Port Errors ============

/// Errors raised by the set-once channel ports an operator embeds.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PortError {
    /// The port already holds a channel handle from an earlier wiring step.
    #[snafu(display("{port} channel is already bound"))]
    AlreadyBound { port: &'static str },

    /// The port was read before any channel was bound to it.
    #[snafu(display("{port} channel was never bound"))]
    Unbound { port: &'static str },

    /// The operator owning the port has already been launched or is gone.
    #[snafu(display("{port} channel belongs to an operator that is no longer reachable"))]
    Unreachable { port: &'static str },
}

// ============ Chain Errors ============

/// Errors that can occur while composing or driving a chain.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChainError {
    /// An operator placed after another one cannot accept an input channel.
    #[snafu(display("Operator '{operator}' in chain '{chain}' does not accept an input channel"))]
    MissingInput { chain: String, operator: String },

    /// The previous operator left no output channel to wire from.
    #[snafu(display(
        "Operator '{operator}' in chain '{chain}' has no output channel available for wiring"
    ))]
    MissingOutput { chain: String, operator: String },

    /// Binding a channel into an operator port failed.
    #[snafu(display("Failed to wire operator '{operator}': {source}"))]
    Wiring { operator: String, source: PortError },

    /// A parallel operator could not be switched to order-preserving mode.
    #[snafu(display(
        "Parallel operator '{operator}' could not be made order-preserving for chain '{chain}'"
    ))]
    Unordered { chain: String, operator: String },

    /// An operation that needs the first operator ran on an empty chain.
    #[snafu(display("Chain '{chain}' has no operators"))]
    EmptyChain { chain: String },

    /// The chain was already launched.
    #[snafu(display("Chain '{chain}' has already been started"))]
    AlreadyStarted { chain: String },

    /// `wait` was called before `start`.
    #[snafu(display("Chain '{chain}' has not been started"))]
    NotStarted { chain: String },

    /// `wait` was called again after an earlier call already reported the outcome.
    #[snafu(display("Chain '{chain}' has already finished and its outcome was reported"))]
    AlreadyFinished { chain: String },

    /// An operator terminated with an error and the chain was hard-stopped.
    #[snafu(display("Operator '{operator}' failed in chain '{chain}': {source}"))]
    OperatorFailed {
        chain: String,
        operator: String,
        source: OperatorError,
    },

    /// The supervisor task tracking operator completion could not be joined.
    #[snafu(display("Supervisor for chain '{chain}' failed: {source}"))]
    Supervisor {
        chain: String,
        source: tokio::task::JoinError,
    },
}

impl ChainError {
    /// Returns the operator error behind an [`ChainError::OperatorFailed`].
    pub fn operator_error(&self) -> Option<&OperatorError> {
        match self {
            ChainError::OperatorFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// One or more environment variables referenced by the config could not be substituted.
    #[snafu(display("Environment interpolation failed: {}", errors.join("; ")))]
    Interpolation { errors: Vec<String> },

    /// Channel slack must leave room for at least one in-flight item.
    #[snafu(display("Chain '{chain}' has chan_slack 0; it must be at least 1"))]
    ZeroSlack { chain: String },

    /// Worker count must be positive.
    #[snafu(display("Worker count must be at least 1"))]
    ZeroWorkers,

    /// Metrics address could not be parsed.
    #[snafu(display("Invalid metrics address '{address}': {source}"))]
    MetricsAddress {
        address: String,
        source: std::net::AddrParseError,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}
