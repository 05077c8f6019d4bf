//! A chain that only admits order-preserving parallel operators.

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::mpsc;
use tracing::info;

use super::{Chain, ChainStopHandle, SimpleChain};
use crate::config::ChainConfig;
use crate::error::{ChainError, UnorderedSnafu};
use crate::operator::Operator;
use crate::runner::OperatorSlot;

/// A [`SimpleChain`] whose `add` switches parallel operators into
/// order-preserving mode and refuses those that cannot be switched.
///
/// The check happens at composition time, so a running ordered chain never
/// has to detect or reorder out-of-order output.
pub struct OrderedChain<T: Send + 'static> {
    inner: SimpleChain<T>,
}

impl<T: Send + 'static> Default for OrderedChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for OrderedChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OrderedChain").field(&self.inner).finish()
    }
}

impl<T: Send + 'static> OrderedChain<T> {
    pub fn new() -> Self {
        Self {
            inner: SimpleChain::new(),
        }
    }

    pub fn with_slack(chan_slack: usize) -> Self {
        Self {
            inner: SimpleChain::with_slack(chan_slack),
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            inner: SimpleChain::from_config(config),
        }
    }

    pub fn chan_slack(&self) -> usize {
        self.inner.chan_slack()
    }

    pub fn into_inner(self) -> SimpleChain<T> {
        self.inner
    }
}

#[async_trait]
impl<T: Send + 'static> Chain<T> for OrderedChain<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.inner.set_name(name);
        self
    }

    fn operators(&self) -> &[OperatorSlot<T>] {
        self.inner.operators()
    }

    fn operators_mut(&mut self) -> &mut [OperatorSlot<T>] {
        self.inner.operators_mut()
    }

    fn add_boxed(&mut self, mut operator: Box<dyn Operator<T>>) -> Result<&mut Self, ChainError> {
        let name = operator.name().to_string();

        if let Some(parallel) = operator.as_order_adjustable_mut() {
            if !parallel.is_ordered() {
                parallel.make_ordered();
                ensure!(
                    parallel.is_ordered(),
                    UnorderedSnafu {
                        chain: self.inner.name(),
                        operator: name.as_str(),
                    }
                );
                info!(chain = %self.inner.name(), operator = %name, "Switched parallel operator to ordered mode");
            }
        }

        self.inner.add_boxed(operator)?;
        Ok(self)
    }

    fn new_sub_chain(&self) -> Self {
        Self {
            inner: self.inner.new_sub_chain(),
        }
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<T>> {
        self.inner.take_output()
    }

    fn start(&mut self) -> Result<(), ChainError> {
        self.inner.start()
    }

    async fn wait(&mut self) -> Result<(), ChainError> {
        self.inner.wait().await
    }

    fn soft_stop(&self) -> Result<(), ChainError> {
        self.inner.soft_stop()
    }

    fn stop(&self) -> Result<(), ChainError> {
        self.inner.stop()
    }

    fn stop_handle(&self) -> ChainStopHandle {
        self.inner.stop_handle()
    }
}
