//! Runtime failure type returned by operators.

use snafu::prelude::*;
use tokio::task::JoinError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why an operator stopped without finishing its input.
///
/// Either failure hard-stops the chain the operator runs in.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum OperatorError {
    /// The operator, or a job it spawned, panicked.
    #[snafu(display("panicked: {message}"))]
    Panicked { message: String },

    /// The operator rejected an item or lost a resource it depends on.
    #[snafu(display("{source}"))]
    Failed { source: BoxError },
}

impl OperatorError {
    /// Wrap any error as an operator failure.
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed {
            source: Box::new(err),
        }
    }

    /// Fail with a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed {
            source: message.into().into(),
        }
    }

    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Report a task that ended abnormally: a panic keeps its payload text,
    /// anything else (a runtime shutting down) is a plain failure.
    pub(crate) fn from_join_error(err: JoinError) -> Self {
        if !err.is_panic() {
            return Self::failed(err);
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_displays_cause_only() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert_eq!(OperatorError::failed(io_err).to_string(), "pipe closed");
        assert_eq!(OperatorError::msg("bad record").to_string(), "bad record");
    }

    #[test]
    fn test_failure_keeps_source() {
        let err = OperatorError::msg("bad record");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_panicked());
    }

    #[tokio::test]
    async fn test_panic_payload_is_kept() {
        let handle = tokio::spawn(async { panic!("boom") });
        let err = OperatorError::from_join_error(handle.await.unwrap_err());
        assert!(err.is_panicked());
        assert_eq!(err.to_string(), "panicked: boom");
    }

    #[tokio::test]
    async fn test_aborted_task_is_a_failure() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = OperatorError::from_join_error(handle.await.unwrap_err());
        assert!(!err.is_panicked());
        assert!(err.to_string().contains("cancelled"));
    }
}
