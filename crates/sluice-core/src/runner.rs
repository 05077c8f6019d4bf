//! Concurrent execution of a chain's operators.
//!
//! The runner owns every registered operator until launch, then runs each one
//! as its own tokio task. A supervisor task drains the `JoinSet`, records the
//! first failure and fires the close notification.

use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, error, info, warn};

use crate::emit;
use crate::error::{ChainError, SupervisorSnafu};
use crate::metrics::events::{OperatorFinished, OperatorStatus, OperatorsLaunched};
use crate::operator::{Operator, OperatorContext, OperatorError};

/// A registered operator and its graceful-stop signal.
///
/// The operator itself is moved into its task on launch; the slot keeps the
/// name and stop token so the chain can still address it afterwards.
pub struct OperatorSlot<T: Send + 'static> {
    name: String,
    stop: CancellationToken,
    operator: Option<Box<dyn Operator<T>>>,
}

impl<T: Send + 'static> OperatorSlot<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operator, until the runner launches it.
    pub fn operator(&self) -> Option<&(dyn Operator<T> + 'static)> {
        self.operator.as_deref()
    }

    pub fn operator_mut(&mut self) -> Option<&mut (dyn Operator<T> + 'static)> {
        self.operator.as_deref_mut()
    }

    pub fn is_launched(&self) -> bool {
        self.operator.is_none()
    }

    /// Request a graceful stop of this operator only.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

impl<T: Send + 'static> std::fmt::Debug for OperatorSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorSlot")
            .field("name", &self.name)
            .field("launched", &self.is_launched())
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

/// The first operator failure observed by a runner.
#[derive(Debug)]
pub struct OperatorFailure {
    pub operator: String,
    pub error: OperatorError,
}

type OperatorOutcome = (String, Result<(), OperatorError>);

/// Launches operators concurrently and tracks their joint completion.
pub struct Runner<T: Send + 'static> {
    slots: Vec<OperatorSlot<T>>,
    hard_stop: CancellationToken,
    closed: CancellationToken,
    errors_tx: mpsc::Sender<OperatorFailure>,
    errors_rx: mpsc::Receiver<OperatorFailure>,
    completion: Option<JoinHandle<()>>,
    launched: bool,
}

impl<T: Send + 'static> Default for Runner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Runner<T> {
    pub fn new() -> Self {
        let (errors_tx, errors_rx) = mpsc::channel(1);
        Self {
            slots: Vec::new(),
            hard_stop: CancellationToken::new(),
            closed: CancellationToken::new(),
            errors_tx,
            errors_rx,
            completion: None,
            launched: false,
        }
    }

    /// Register an operator. Its graceful-stop token is a child of the hard-stop token.
    pub fn add(&mut self, operator: Box<dyn Operator<T>>) {
        self.slots.push(OperatorSlot {
            name: operator.name().to_string(),
            stop: self.hard_stop.child_token(),
            operator: Some(operator),
        });
    }

    /// Registered operators in insertion order.
    pub fn operators(&self) -> &[OperatorSlot<T>] {
        &self.slots
    }

    pub fn operators_mut(&mut self) -> &mut [OperatorSlot<T>] {
        &mut self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Spawn one task per registered operator plus the supervisor.
    ///
    /// Must be called from within a Tokio runtime. A second call is ignored.
    pub fn async_run_all(&mut self, chain: &str) {
        if self.launched {
            warn!(chain = %chain, "Runner already launched");
            return;
        }
        self.launched = true;

        let mut tasks: JoinSet<OperatorOutcome> = JoinSet::new();
        for slot in &mut self.slots {
            let Some(operator) = slot.operator.take() else {
                continue;
            };
            let name = slot.name.clone();
            let ctx = OperatorContext::new(name.clone(), slot.stop.clone(), self.hard_stop.clone());

            tasks.spawn(async move {
                // Inner task so a panic is reported against the operator's name.
                let result = match tokio::spawn(operator.run(ctx)).await {
                    Ok(result) => result,
                    Err(e) => Err(OperatorError::from_join_error(e)),
                };
                (name, result)
            });
        }

        info!(chain = %chain, "Spawned {} operator tasks", tasks.len());
        emit!(OperatorsLaunched {
            chain: chain.to_string(),
            count: tasks.len(),
        });

        self.completion = Some(tokio::spawn(supervise(
            chain.to_string(),
            tasks,
            self.closed.clone(),
            self.errors_tx.clone(),
        )));
    }

    /// Hard-stop every operator at once.
    pub fn hard_stop_all(&self) {
        self.hard_stop.cancel();
    }

    pub fn is_hard_stopped(&self) -> bool {
        self.hard_stop.is_cancelled()
    }

    pub(crate) fn hard_stop_token(&self) -> CancellationToken {
        self.hard_stop.clone()
    }

    /// Resolves once every operator has terminated or the first one has failed.
    ///
    /// The returned future owns its token and does not borrow the runner.
    pub fn close_notified(&self) -> WaitForCancellationFutureOwned {
        self.closed.clone().cancelled_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Non-blocking check of the error signal.
    pub fn take_error(&mut self) -> Option<OperatorFailure> {
        self.errors_rx.try_recv().ok()
    }

    /// Block until every launched operator has terminated.
    ///
    /// Returns `false` when the completion was already joined by an earlier call.
    pub async fn join(&mut self, chain: &str) -> Result<bool, ChainError> {
        let Some(handle) = self.completion.take() else {
            return Ok(false);
        };
        handle.await.context(SupervisorSnafu { chain })?;
        Ok(true)
    }

    pub fn is_joined(&self) -> bool {
        self.launched && self.completion.is_none()
    }
}

async fn supervise(
    chain: String,
    mut tasks: JoinSet<OperatorOutcome>,
    closed: CancellationToken,
    errors: mpsc::Sender<OperatorFailure>,
) {
    while let Some(joined) = tasks.join_next().await {
        let (operator, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(chain = %chain, error = %e, "Operator wrapper task failed");
                continue;
            }
        };

        match result {
            Ok(()) => {
                debug!(chain = %chain, operator = %operator, "Operator completed");
                emit!(OperatorFinished {
                    chain: chain.clone(),
                    status: OperatorStatus::Success,
                });
            }
            Err(error) => {
                let status = if error.is_panicked() {
                    OperatorStatus::Panicked
                } else {
                    OperatorStatus::Failed
                };
                emit!(OperatorFinished {
                    chain: chain.clone(),
                    status,
                });
                warn!(chain = %chain, operator = %operator, error = %error, "Operator failed");

                // First writer wins; later failures are only logged.
                if errors.try_send(OperatorFailure { operator, error }).is_ok() {
                    closed.cancel();
                }
            }
        }
    }

    closed.cancel();
    debug!(chain = %chain, "All operators terminated");
}
