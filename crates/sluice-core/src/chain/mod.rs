//! Linear operator chains.
//!
//! - [`SimpleChain`] - wires each operator's output into the next one's input
//!   and drives the start / wait / stop lifecycle
//! - [`OrderedChain`] - a `SimpleChain` that only admits order-preserving
//!   parallel operators
//! - [`InChain`] - presents a whole chain as a single input-bearing operator
//!   so it can be nested inside another chain

mod in_chain;
mod ordered;
mod simple;
mod stop;

pub use in_chain::InChain;
pub use ordered::OrderedChain;
pub use simple::SimpleChain;
pub use stop::ChainStopHandle;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChainError;
use crate::operator::Operator;
use crate::runner::OperatorSlot;

/// Shorthand for [`SimpleChain::new`].
pub fn new_chain<T: Send + 'static>() -> SimpleChain<T> {
    SimpleChain::new()
}

/// A pipeline of operators with automatically wired channels.
///
/// Lifecycle: `Created -> Running -> {SoftStopping, HardStopping} -> Stopped`.
/// `start`, `wait`, `soft_stop` and `stop` are expected to be driven by one
/// controller; the stop latch itself tolerates concurrent callers.
#[async_trait]
pub trait Chain<T: Send + 'static>: Send {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: impl Into<String>) -> &mut Self
    where
        Self: Sized;

    /// Registered operators in pipeline order.
    fn operators(&self) -> &[OperatorSlot<T>];

    fn operators_mut(&mut self) -> &mut [OperatorSlot<T>];

    /// Append an operator, wiring the previous operator's output into its input.
    fn add_boxed(&mut self, operator: Box<dyn Operator<T>>) -> Result<&mut Self, ChainError>
    where
        Self: Sized;

    fn add<O: Operator<T>>(&mut self, operator: O) -> Result<&mut Self, ChainError>
    where
        Self: Sized,
    {
        self.add_boxed(Box::new(operator))
    }

    /// A fresh, empty chain of the same kind and policy.
    fn new_sub_chain(&self) -> Self
    where
        Self: Sized;

    /// Hand the last operator's output channel to the caller.
    fn take_output(&mut self) -> Option<mpsc::Receiver<T>>;

    /// Launch every operator concurrently. Non-blocking.
    fn start(&mut self) -> Result<(), ChainError>;

    /// Block until every operator has terminated, driving the soft or hard stop path.
    async fn wait(&mut self) -> Result<(), ChainError>;

    /// Graceful stop: only the first operator is asked to stop.
    fn soft_stop(&self) -> Result<(), ChainError>;

    /// Hard stop: every operator is aborted.
    fn stop(&self) -> Result<(), ChainError>;

    fn stop_handle(&self) -> ChainStopHandle;

    /// `start` followed by `wait`.
    async fn run(&mut self) -> Result<(), ChainError> {
        self.start()?;
        self.wait().await
    }
}
