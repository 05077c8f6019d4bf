//! The base chain implementation.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Chain, ChainStopHandle};
use crate::config::ChainConfig;
use crate::emit;
use crate::error::{
    AlreadyBoundSnafu, AlreadyFinishedSnafu, AlreadyStartedSnafu, ChainError, EmptyChainSnafu,
    MissingInputSnafu, MissingOutputSnafu, NotStartedSnafu, OperatorFailedSnafu, PortError,
    WiringSnafu,
};
use crate::metrics::events::{ChainCompleted, ChannelWired, WireDirection};
use crate::operator::{CHAN_SLACK, Operator};
use crate::runner::{OperatorFailure, OperatorSlot, Runner};

const DEFAULT_CHAIN_NAME: &str = "chain";

/// A linear chain of operators driven by a [`Runner`].
pub struct SimpleChain<T: Send + 'static> {
    name: String,
    runner: Runner<T>,
    /// Receiver of the newest operator's output, handed to the next `add`.
    tail: Option<mpsc::Receiver<T>>,
    chan_slack: usize,
    sent_stop: Arc<AtomicBool>,
    /// Graceful-stop token of the first operator, set by the first `add`.
    entry: Arc<OnceLock<CancellationToken>>,
    started_at: Option<Instant>,
}

impl<T: Send + 'static> Default for SimpleChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> SimpleChain<T> {
    pub fn new() -> Self {
        Self::with_slack(CHAN_SLACK)
    }

    /// Create a chain whose inter-operator channels hold `chan_slack` items.
    ///
    /// A slack of 0 is raised to 1, since tokio channels need room for one item.
    pub fn with_slack(chan_slack: usize) -> Self {
        Self {
            name: DEFAULT_CHAIN_NAME.to_string(),
            runner: Runner::new(),
            tail: None,
            chan_slack: chan_slack.max(1),
            sent_stop: Arc::new(AtomicBool::new(false)),
            entry: Arc::new(OnceLock::new()),
            started_at: None,
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        let mut chain = Self::with_slack(config.chan_slack);
        chain.name = config.name.clone();
        chain
    }

    pub fn chan_slack(&self) -> usize {
        self.chan_slack
    }

    pub fn is_started(&self) -> bool {
        self.runner.is_launched()
    }
}

fn ensure_free(bound: bool, port: &'static str) -> Result<(), PortError> {
    ensure!(!bound, AlreadyBoundSnafu { port });
    Ok(())
}

#[async_trait]
impl<T: Send + 'static> Chain<T> for SimpleChain<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    fn operators(&self) -> &[OperatorSlot<T>] {
        self.runner.operators()
    }

    fn operators_mut(&mut self) -> &mut [OperatorSlot<T>] {
        self.runner.operators_mut()
    }

    fn add_boxed(&mut self, mut operator: Box<dyn Operator<T>>) -> Result<&mut Self, ChainError> {
        ensure!(
            !self.runner.is_launched(),
            AlreadyStartedSnafu {
                chain: self.name.as_str()
            }
        );
        let name = operator.name().to_string();

        // Every check runs before the previous output is handed over, so a
        // rejected operator leaves the chain as it was.
        let previous = self.runner.operators().last().map(|slot| slot.name().to_string());
        if let Some(previous) = &previous {
            let inbound = operator.as_inbound_mut().context(MissingInputSnafu {
                chain: self.name.as_str(),
                operator: name.as_str(),
            })?;
            ensure_free(inbound.input().is_some(), "input").context(WiringSnafu {
                operator: name.as_str(),
            })?;
            ensure!(
                self.tail.is_some(),
                MissingOutputSnafu {
                    chain: self.name.as_str(),
                    operator: previous.as_str(),
                }
            );
        }
        if let Some(outbound) = operator.as_outbound_mut() {
            ensure_free(outbound.output().is_some(), "output").context(WiringSnafu {
                operator: name.as_str(),
            })?;
        }

        if let Some(previous) = previous {
            let inbound = operator.as_inbound_mut().context(MissingInputSnafu {
                chain: self.name.as_str(),
                operator: name.as_str(),
            })?;
            let input = self.tail.take().context(MissingOutputSnafu {
                chain: self.name.as_str(),
                operator: previous,
            })?;

            info!(chain = %self.name, operator = %name, "Setting input channel");
            inbound.set_in(input).context(WiringSnafu {
                operator: name.as_str(),
            })?;
            emit!(ChannelWired {
                chain: self.name.clone(),
                direction: WireDirection::Input,
            });
        }

        if let Some(outbound) = operator.as_outbound_mut() {
            info!(chain = %self.name, operator = %name, "Setting output channel");
            let (tx, rx) = mpsc::channel(self.chan_slack);
            outbound.set_out(tx).context(WiringSnafu {
                operator: name.as_str(),
            })?;
            self.tail = Some(rx);
            emit!(ChannelWired {
                chain: self.name.clone(),
                direction: WireDirection::Output,
            });
        }

        self.runner.add(operator);
        if let Some(first) = self.runner.operators().first() {
            self.entry.get_or_init(|| first.stop_token());
        }
        Ok(self)
    }

    fn new_sub_chain(&self) -> Self {
        Self::with_slack(self.chan_slack)
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<T>> {
        self.tail.take()
    }

    fn start(&mut self) -> Result<(), ChainError> {
        ensure!(
            !self.runner.is_empty(),
            EmptyChainSnafu {
                chain: self.name.as_str()
            }
        );
        ensure!(
            !self.runner.is_launched(),
            AlreadyStartedSnafu {
                chain: self.name.as_str()
            }
        );

        info!(chain = %self.name, operators = self.runner.len(), "Starting chain");
        self.started_at = Some(Instant::now());
        self.runner.async_run_all(&self.name);
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), ChainError> {
        ensure!(
            self.runner.is_launched(),
            NotStartedSnafu {
                chain: self.name.as_str()
            }
        );
        ensure!(
            !self.runner.is_joined(),
            AlreadyFinishedSnafu {
                chain: self.name.as_str()
            }
        );

        info!(chain = %self.name, "Waiting for close notification");
        let closed = self.runner.close_notified();
        closed.await;

        let failure = self.runner.take_error();
        match &failure {
            Some(OperatorFailure { operator, error }) => {
                warn!(chain = %self.name, operator = %operator, error = %error, "Hard close");
                self.stop()?;
            }
            None => {
                info!(chain = %self.name, "Soft close");
                self.soft_stop()?;
            }
        }

        info!(chain = %self.name, "Waiting for operators to finish");
        self.runner.join(&self.name).await?;
        info!(chain = %self.name, "Exiting chain");

        if let Some(started_at) = self.started_at.take() {
            emit!(ChainCompleted {
                chain: self.name.clone(),
                duration: started_at.elapsed(),
            });
        }

        match failure {
            Some(OperatorFailure { operator, error }) => Err(error).context(OperatorFailedSnafu {
                chain: self.name.as_str(),
                operator,
            }),
            None => Ok(()),
        }
    }

    fn soft_stop(&self) -> Result<(), ChainError> {
        self.stop_handle().soft_stop()
    }

    fn stop(&self) -> Result<(), ChainError> {
        self.stop_handle().stop()
    }

    fn stop_handle(&self) -> ChainStopHandle {
        ChainStopHandle::new(
            self.name.clone(),
            self.sent_stop.clone(),
            self.entry.clone(),
            self.runner.hard_stop_token(),
        )
    }
}

impl<T: Send + 'static> std::fmt::Debug for SimpleChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleChain")
            .field("name", &self.name)
            .field("operators", &self.runner.operators())
            .field("chan_slack", &self.chan_slack)
            .field("started", &self.runner.is_launched())
            .finish_non_exhaustive()
    }
}
