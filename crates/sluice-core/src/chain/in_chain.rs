//! Presents a whole chain as a single input-bearing operator.

use std::marker::PhantomData;

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Chain;
use crate::error::{ChainError, EmptyChainSnafu, MissingInputSnafu, PortError, UnreachableSnafu};
use crate::operator::{Inbound, Operator, OperatorContext, OperatorError};

/// Wraps a chain so an outer chain can `add` it like any other operator.
///
/// Input queries and wiring go straight to the wrapped chain's first operator.
/// When run, the wrapped chain is started and its stop paths follow the outer
/// chain's: a graceful stop becomes a soft stop, a hard stop a hard stop.
pub struct InChain<C, T> {
    chain: C,
    _item: PhantomData<fn(T) -> T>,
}

impl<C, T> InChain<C, T>
where
    C: Chain<T>,
    T: Send + 'static,
{
    /// Wrap `chain`. Its first operator must accept an input channel.
    pub fn new(chain: C) -> Result<Self, ChainError> {
        let first = chain.operators().first().context(EmptyChainSnafu {
            chain: chain.name(),
        })?;
        let accepts_input = first
            .operator()
            .is_some_and(|operator| operator.as_inbound().is_some());
        ensure!(
            accepts_input,
            MissingInputSnafu {
                chain: chain.name(),
                operator: first.name(),
            }
        );

        Ok(Self {
            chain,
            _item: PhantomData,
        })
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    pub fn into_inner(self) -> C {
        self.chain
    }

    fn entry(&self) -> Option<&dyn Inbound<T>> {
        self.chain.operators().first()?.operator()?.as_inbound()
    }

    fn entry_mut(&mut self) -> Option<&mut dyn Inbound<T>> {
        self.chain
            .operators_mut()
            .first_mut()?
            .operator_mut()?
            .as_inbound_mut()
    }
}

impl<C, T> Inbound<T> for InChain<C, T>
where
    C: Chain<T>,
    T: Send + 'static,
{
    fn set_in(&mut self, input: mpsc::Receiver<T>) -> Result<(), PortError> {
        let entry = self.entry_mut().context(UnreachableSnafu { port: "input" })?;
        entry.set_in(input)
    }

    fn input(&self) -> Option<&mpsc::Receiver<T>> {
        self.entry()?.input()
    }

    fn in_depth(&self) -> usize {
        self.entry().map(|entry| entry.in_depth()).unwrap_or(0)
    }
}

#[async_trait]
impl<C, T> Operator<T> for InChain<C, T>
where
    C: Chain<T> + 'static,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn as_inbound(&self) -> Option<&dyn Inbound<T>> {
        Some(self)
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<T>> {
        Some(self)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let mut chain = self.chain;
        chain.start().map_err(OperatorError::failed)?;

        let handle = chain.stop_handle();
        let forwarder = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = ctx.hard_stopped() => handle.stop(),
                _ = ctx.stopped() => handle.soft_stop(),
            };
            if let Err(e) = result {
                warn!(operator = %ctx.name(), error = %e, "Failed to forward stop to nested chain");
            }
        });

        let result = chain.wait().await;
        forwarder.abort();
        debug!(chain = %chain.name(), "Nested chain finished");

        result.map_err(OperatorError::failed)
    }
}
