//! sluice-core: operator chains for in-process stream pipelines.
//!
//! A chain is an ordered list of operators. Adding an operator wires the
//! previous operator's output channel into its input; starting the chain runs
//! every operator as its own task; waiting drives the soft or hard stop path
//! depending on whether any operator failed.
//!
//! - `operator/` - the `Operator` trait, its capabilities and set-once ports
//! - `operators/` - stock sources, transforms and sinks
//! - `chain/` - `SimpleChain`, `OrderedChain`, `InChain` and the stop handle
//! - `runner` - concurrent launch, close notification and first-error capture
//! - `config/` - YAML configuration with environment interpolation
//! - `metrics/` - Prometheus metrics infrastructure
//! - `signal` - Signal handling for graceful shutdown
//! - `error` - Chain, port, config and metrics error types

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod operator;
pub mod operators;
pub mod runner;
pub mod signal;
pub mod tracing;

// Re-export commonly used items
pub use chain::{Chain, ChainStopHandle, InChain, OrderedChain, SimpleChain, new_chain};
pub use config::{ChainConfig, MetricsConfig, load_yaml, parse_yaml};
pub use error::{ChainError, ConfigError, MetricsError, PortError};
pub use metrics::{DEFAULT_METRICS_ADDR, init_global as init_metrics};
pub use operator::{
    CHAN_SLACK, Inbound, Inlet, Operator, OperatorContext, OperatorError, OrderAdjustable,
    Outbound, Outlet,
};
pub use runner::{OperatorFailure, OperatorSlot, Runner};
pub use signal::shutdown_signal;
pub use self::tracing::init_tracing;
