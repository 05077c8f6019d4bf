//! Internal events for chain metrics emission.
//!
//! Each event struct represents a measurable occurrence in a chain. Events
//! implement the `InternalEvent` trait which emits the corresponding metric.
//! Every metric carries a `chain` label.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Which end of an operator a channel was wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDirection {
    Input,
    Output,
}

impl WireDirection {
    fn as_str(&self) -> &'static str {
        match self {
            WireDirection::Input => "input",
            WireDirection::Output => "output",
        }
    }
}

/// Event emitted when the chain binds a channel into an operator.
pub struct ChannelWired {
    pub chain: String,
    pub direction: WireDirection,
}

impl InternalEvent for ChannelWired {
    fn emit(self) {
        trace!(chain = %self.chain, direction = self.direction.as_str(), "Channel wired");
        counter!(
            "sluice_channels_wired_total",
            "chain" => self.chain,
            "direction" => self.direction.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when the runner launches its operators.
pub struct OperatorsLaunched {
    pub chain: String,
    pub count: usize,
}

impl InternalEvent for OperatorsLaunched {
    fn emit(self) {
        trace!(chain = %self.chain, count = self.count, "Operators launched");
        counter!("sluice_operators_launched_total", "chain" => self.chain.clone())
            .increment(self.count as u64);
        gauge!("sluice_operators_running", "chain" => self.chain).increment(self.count as f64);
    }
}

/// How an operator terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Success,
    Failed,
    Panicked,
}

impl OperatorStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OperatorStatus::Success => "success",
            OperatorStatus::Failed => "failed",
            OperatorStatus::Panicked => "panicked",
        }
    }
}

/// Event emitted when one operator's task terminates.
pub struct OperatorFinished {
    pub chain: String,
    pub status: OperatorStatus,
}

impl InternalEvent for OperatorFinished {
    fn emit(self) {
        trace!(chain = %self.chain, status = self.status.as_str(), "Operator finished");
        counter!(
            "sluice_operators_finished_total",
            "chain" => self.chain.clone(),
            "status" => self.status.as_str()
        )
        .increment(1);
        gauge!("sluice_operators_running", "chain" => self.chain).decrement(1.0);
    }
}

/// Shutdown path taken by a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    Soft,
    Hard,
}

impl StopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopMode::Soft => "soft",
            StopMode::Hard => "hard",
        }
    }
}

/// Event emitted when a chain dispatches its (single) stop.
pub struct ChainStopped {
    pub chain: String,
    pub mode: StopMode,
}

impl InternalEvent for ChainStopped {
    fn emit(self) {
        trace!(chain = %self.chain, mode = self.mode.as_str(), "Chain stopped");
        counter!(
            "sluice_chain_stops_total",
            "chain" => self.chain,
            "mode" => self.mode.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when `wait` returns, with the time since `start`.
pub struct ChainCompleted {
    pub chain: String,
    pub duration: Duration,
}

impl InternalEvent for ChainCompleted {
    fn emit(self) {
        trace!(chain = %self.chain, duration_ms = self.duration.as_millis() as u64, "Chain completed");
        histogram!("sluice_chain_duration_seconds", "chain" => self.chain)
            .record(self.duration.as_secs_f64());
    }
}
