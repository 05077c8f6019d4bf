//! Sluice: line-oriented stream processing on top of sluice-core chains.
//!
//! Reads lines from stdin, transforms them in a parallel stage and writes
//! them to stdout. SIGINT/SIGTERM/SIGQUIT drain the chain before exit.

pub mod app;
pub mod config;
pub mod error;
pub mod lines;

pub use app::{run, run_with};
pub use config::{AppConfig, CliArgs, TransformConfig, TransformKind};
pub use error::AppError;
