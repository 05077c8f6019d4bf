//! Shared shutdown latch for a chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use snafu::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::emit;
use crate::error::{ChainError, EmptyChainSnafu};
use crate::metrics::events::{ChainStopped, StopMode};

/// Cloneable handle that dispatches a chain's single stop.
///
/// Soft and hard stop share one latch: whichever fires first wins and every
/// later call, from any clone, is a no-op. The first operator is looked up
/// when a soft stop is sent, so a handle taken before the first `add` still
/// reaches it.
#[derive(Debug, Clone)]
pub struct ChainStopHandle {
    chain: String,
    sent: Arc<AtomicBool>,
    entry: Arc<OnceLock<CancellationToken>>,
    hard_stop: CancellationToken,
}

impl ChainStopHandle {
    pub(crate) fn new(
        chain: String,
        sent: Arc<AtomicBool>,
        entry: Arc<OnceLock<CancellationToken>>,
        hard_stop: CancellationToken,
    ) -> Self {
        Self {
            chain,
            sent,
            entry,
            hard_stop,
        }
    }

    /// Ask only the first operator to stop and let the rest drain.
    pub fn soft_stop(&self) -> Result<(), ChainError> {
        let entry = self.entry.get().context(EmptyChainSnafu {
            chain: self.chain.as_str(),
        })?;

        if self.latch() {
            warn!(chain = %self.chain, "In soft close");
            emit!(ChainStopped {
                chain: self.chain.clone(),
                mode: StopMode::Soft,
            });
            entry.cancel();
        }
        Ok(())
    }

    /// Abort every operator of the chain.
    pub fn stop(&self) -> Result<(), ChainError> {
        if self.latch() {
            warn!(chain = %self.chain, "In hard close");
            emit!(ChainStopped {
                chain: self.chain.clone(),
                mode: StopMode::Hard,
            });
            self.hard_stop.cancel();
        }
        Ok(())
    }

    pub fn is_stop_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }

    fn latch(&self) -> bool {
        self.sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
