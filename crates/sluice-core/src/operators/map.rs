use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::{recv_or_stop, send_or_abort};
use crate::operator::{
    Inbound, Inlet, Operator, OperatorContext, OperatorError, OrderAdjustable, Outbound, Outlet,
};

/// Applies a fallible function to every item, one at a time.
///
/// A function error fails the operator, which hard-stops the whole chain.
pub struct Map<T, F> {
    name: String,
    f: F,
    inlet: Inlet<T>,
    outlet: Outlet<T>,
}

impl<T, F> Map<T, F>
where
    F: FnMut(T) -> Result<T, OperatorError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            inlet: Inlet::new(),
            outlet: Outlet::new(),
        }
    }
}

#[async_trait]
impl<T, F> Operator<T> for Map<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> Result<T, OperatorError> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_inbound(&self) -> Option<&dyn Inbound<T>> {
        Some(&self.inlet)
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<T>> {
        Some(&mut self.inlet)
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<T>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<T>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            mut f,
            mut inlet,
            mut outlet,
            ..
        } = *self;
        let mut rx = inlet.take().map_err(OperatorError::failed)?;
        let tx = outlet.take().map_err(OperatorError::failed)?;

        while let Some(item) = recv_or_stop(&mut rx, &ctx).await {
            let mapped = f(item)?;
            if !send_or_abort(&tx, mapped, &ctx).await {
                break;
            }
        }

        debug!(operator = %ctx.name(), "Map finished");
        Ok(())
    }
}

/// Applies a fallible function to up to `workers` items concurrently.
///
/// Results are emitted as they complete unless the operator has been switched
/// to ordered mode, in which case they follow input order. The function runs on
/// tokio's blocking pool; on a hard stop no new item is started and the
/// operator returns once the jobs already running have finished.
pub struct ParallelMap<T, F> {
    name: String,
    f: Arc<F>,
    workers: usize,
    ordered: bool,
    orderable: bool,
    inlet: Inlet<T>,
    outlet: Outlet<T>,
}

impl<T, F> ParallelMap<T, F>
where
    F: Fn(T) -> Result<T, OperatorError>,
{
    /// `workers` is raised to 1 when 0.
    pub fn new(name: impl Into<String>, workers: usize, f: F) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
            workers: workers.max(1),
            ordered: false,
            orderable: true,
            inlet: Inlet::new(),
            outlet: Outlet::new(),
        }
    }

    /// A variant that ignores `make_ordered` and always emits in completion order.
    pub fn unorderable(name: impl Into<String>, workers: usize, f: F) -> Self {
        Self {
            orderable: false,
            ..Self::new(name, workers, f)
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl<T, F> OrderAdjustable for ParallelMap<T, F>
where
    T: Send,
    F: Send + Sync,
{
    fn is_ordered(&self) -> bool {
        self.ordered
    }

    fn make_ordered(&mut self) {
        if self.orderable {
            self.ordered = true;
        }
    }
}

#[async_trait]
impl<T, F> Operator<T> for ParallelMap<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Result<T, OperatorError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_inbound(&self) -> Option<&dyn Inbound<T>> {
        Some(&self.inlet)
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<T>> {
        Some(&mut self.inlet)
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<T>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<T>> {
        Some(&mut self.outlet)
    }

    fn as_order_adjustable(&self) -> Option<&dyn OrderAdjustable> {
        Some(self)
    }

    fn as_order_adjustable_mut(&mut self) -> Option<&mut dyn OrderAdjustable> {
        Some(self)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            f,
            workers,
            ordered,
            mut inlet,
            mut outlet,
            ..
        } = *self;
        let rx = inlet.take().map_err(OperatorError::failed)?;
        let tx = outlet.take().map_err(OperatorError::failed)?;

        let jobs = ReceiverStream::new(rx)
            .take_until(ctx.stop_token().cancelled_owned())
            .map(move |item| {
                let f = f.clone();
                tokio::task::spawn_blocking(move || f(item))
            });
        let mut results: BoxStream<'static, _> = if ordered {
            jobs.buffered(workers).boxed()
        } else {
            jobs.buffer_unordered(workers).boxed()
        };

        debug!(operator = %ctx.name(), workers, ordered, "Parallel map started");

        loop {
            let joined = tokio::select! {
                biased;
                _ = ctx.hard_stopped() => break,
                joined = results.next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let mapped = joined.map_err(OperatorError::from_join_error)??;
            if !send_or_abort(&tx, mapped, &ctx).await {
                break;
            }
        }

        if ctx.is_hard_stopped() {
            // Stop already cut the input, so this only drains jobs in flight.
            let discarded = results.count().await;
            debug!(operator = %ctx.name(), discarded, "Discarded in-flight results");
        }

        debug!(operator = %ctx.name(), "Parallel map finished");
        Ok(())
    }
}
