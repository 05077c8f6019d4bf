//! Per-operator execution context.

use tokio_util::sync::CancellationToken;

/// Stop signals handed to an operator when the runner launches it.
///
/// The graceful token is a child of the hard-stop token, so a hard stop also
/// resolves [`OperatorContext::stopped`].
#[derive(Debug, Clone)]
pub struct OperatorContext {
    name: String,
    stop: CancellationToken,
    hard_stop: CancellationToken,
}

impl OperatorContext {
    pub fn new(name: impl Into<String>, stop: CancellationToken, hard_stop: CancellationToken) -> Self {
        Self {
            name: name.into(),
            stop,
            hard_stop,
        }
    }

    /// Context whose signals are never fired by anyone but the caller.
    pub fn detached(name: impl Into<String>) -> Self {
        let hard_stop = CancellationToken::new();
        Self::new(name, hard_stop.child_token(), hard_stop)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves once a graceful or hard stop has been requested.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Resolves once a hard stop has been requested.
    pub async fn hard_stopped(&self) {
        self.hard_stop.cancelled().await
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn is_hard_stopped(&self) -> bool {
        self.hard_stop.is_cancelled()
    }

    /// Graceful-stop token, for operators that spawn helpers of their own.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn hard_stop_token(&self) -> CancellationToken {
        self.hard_stop.clone()
    }
}
