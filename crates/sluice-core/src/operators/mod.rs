//! Stock operators for building chains.
//!
//! - [`IterSource`], [`ChannelSource`] - output-only entry points
//! - [`Map`] - sequential transform
//! - [`ParallelMap`] - concurrent transform that can be switched to input order
//! - [`ForEach`] - input-only sink
//!
//! Every operator finishes on its own once its input closes, stops reading on
//! a graceful stop and returns immediately on a hard stop. A closed downstream
//! channel is treated as a normal finish.

mod map;
mod sink;
mod source;

pub use map::{Map, ParallelMap};
pub use sink::ForEach;
pub use source::{ChannelSource, IterSource};

use tokio::sync::mpsc;

use crate::operator::OperatorContext;

/// Receive the next item unless the operator has been asked to stop.
async fn recv_or_stop<T>(rx: &mut mpsc::Receiver<T>, ctx: &OperatorContext) -> Option<T> {
    tokio::select! {
        biased;
        _ = ctx.stopped() => None,
        item = rx.recv() => item,
    }
}

/// Send an item downstream. Returns `false` on hard stop or a closed receiver.
async fn send_or_abort<T>(tx: &mpsc::Sender<T>, item: T, ctx: &OperatorContext) -> bool {
    tokio::select! {
        biased;
        _ = ctx.hard_stopped() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}
