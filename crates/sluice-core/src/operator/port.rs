//! Set-once channel ports.
//!
//! Operators embed an [`Inlet`] and/or [`Outlet`] and expose them through the
//! [`Inbound`](super::Inbound) / [`Outbound`](super::Outbound) capabilities.
//! The chain binds each port exactly once while wiring; a second bind is
//! rejected rather than silently replacing the handle.

use snafu::prelude::*;
use tokio::sync::mpsc;

use crate::error::{AlreadyBoundSnafu, PortError, UnboundSnafu};

/// Receiving side of an operator.
#[derive(Debug)]
pub struct Inlet<T> {
    rx: Option<mpsc::Receiver<T>>,
}

impl<T> Default for Inlet<T> {
    fn default() -> Self {
        Self { rx: None }
    }
}

impl<T> Inlet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the inbound channel.
    pub fn bind(&mut self, rx: mpsc::Receiver<T>) -> Result<(), PortError> {
        ensure!(self.rx.is_none(), AlreadyBoundSnafu { port: "input" });
        self.rx = Some(rx);
        Ok(())
    }

    pub fn get(&self) -> Option<&mpsc::Receiver<T>> {
        self.rx.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.rx.is_some()
    }

    /// Number of items queued on the inbound channel (0 when unbound).
    pub fn depth(&self) -> usize {
        self.rx.as_ref().map(|rx| rx.len()).unwrap_or(0)
    }

    /// Take the receiver out of the port, typically at the start of `run`.
    pub fn take(&mut self) -> Result<mpsc::Receiver<T>, PortError> {
        self.rx.take().context(UnboundSnafu { port: "input" })
    }
}

/// Sending side of an operator.
#[derive(Debug)]
pub struct Outlet<T> {
    tx: Option<mpsc::Sender<T>>,
}

impl<T> Default for Outlet<T> {
    fn default() -> Self {
        Self { tx: None }
    }
}

impl<T> Outlet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the outbound channel.
    pub fn bind(&mut self, tx: mpsc::Sender<T>) -> Result<(), PortError> {
        ensure!(self.tx.is_none(), AlreadyBoundSnafu { port: "output" });
        self.tx = Some(tx);
        Ok(())
    }

    pub fn get(&self) -> Option<&mpsc::Sender<T>> {
        self.tx.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.tx.is_some()
    }

    pub fn take(&mut self) -> Result<mpsc::Sender<T>, PortError> {
        self.tx.take().context(UnboundSnafu { port: "output" })
    }
}
