//! Operator capability contracts.
//!
//! An operator is a single stage of a chain. Besides its name and its `run`
//! body, an operator may implement any of three optional capabilities, which
//! the chain discovers through the `as_*` accessors at wiring time:
//!
//! - [`Inbound`] - accepts an input channel and reports its queue depth
//! - [`Outbound`] - accepts an output channel
//! - [`OrderAdjustable`] - a parallel stage that can be forced to emit in input order

mod context;
mod error;
mod port;

pub use context::OperatorContext;
pub use error::OperatorError;
pub use port::{Inlet, Outlet};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PortError;

/// Buffer capacity of every channel the chain creates between two operators.
pub const CHAN_SLACK: usize = 100;

/// A stage of stream processing.
#[async_trait]
pub trait Operator<T: Send + 'static>: Send + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn as_inbound(&self) -> Option<&dyn Inbound<T>> {
        None
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<T>> {
        None
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<T>> {
        None
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<T>> {
        None
    }

    fn as_order_adjustable(&self) -> Option<&dyn OrderAdjustable> {
        None
    }

    fn as_order_adjustable_mut(&mut self) -> Option<&mut dyn OrderAdjustable> {
        None
    }

    /// Run the operator to completion.
    ///
    /// Implementations should finish on their own once the input channel is
    /// closed, stop producing once `ctx.stopped()` resolves, and return as soon
    /// as possible after `ctx.hard_stopped()` resolves.
    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError>;
}

/// Input-bearing capability.
pub trait Inbound<T>: Send {
    /// Bind the inbound channel. Called once by the chain.
    fn set_in(&mut self, input: mpsc::Receiver<T>) -> Result<(), PortError>;

    fn input(&self) -> Option<&mpsc::Receiver<T>>;

    /// Current number of queued inbound items.
    fn in_depth(&self) -> usize;
}

/// Output-bearing capability.
pub trait Outbound<T>: Send {
    /// Bind the outbound channel. Called once by the chain.
    fn set_out(&mut self, output: mpsc::Sender<T>) -> Result<(), PortError>;

    fn output(&self) -> Option<&mpsc::Sender<T>>;
}

/// Order-preservation capability of a parallel operator.
pub trait OrderAdjustable: Send {
    /// Whether the operator currently emits in input order.
    fn is_ordered(&self) -> bool;

    /// Switch to order-preserving mode if the operator supports it.
    ///
    /// Operators that cannot preserve order leave themselves unchanged; callers
    /// check [`OrderAdjustable::is_ordered`] afterwards.
    fn make_ordered(&mut self);
}

impl<T: Send> Inbound<T> for Inlet<T> {
    fn set_in(&mut self, input: mpsc::Receiver<T>) -> Result<(), PortError> {
        self.bind(input)
    }

    fn input(&self) -> Option<&mpsc::Receiver<T>> {
        self.get()
    }

    fn in_depth(&self) -> usize {
        self.depth()
    }
}

impl<T: Send> Outbound<T> for Outlet<T> {
    fn set_out(&mut self, output: mpsc::Sender<T>) -> Result<(), PortError> {
        self.bind(output)
    }

    fn output(&self) -> Option<&mpsc::Sender<T>> {
        self.get()
    }
}
