use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::operator::{Operator, OperatorContext, OperatorError, Outbound, Outlet};

/// Emits every item of an iterator, then closes its output.
pub struct IterSource<I: Iterator> {
    name: String,
    items: I,
    outlet: Outlet<I::Item>,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(name: impl Into<String>, items: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter(),
            outlet: Outlet::new(),
        }
    }
}

#[async_trait]
impl<I> Operator<I::Item> for IterSource<I>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<I::Item>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<I::Item>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            items, mut outlet, ..
        } = *self;
        let tx = outlet.take().map_err(OperatorError::failed)?;

        let mut emitted = 0usize;
        for item in items {
            // A graceful stop also interrupts a send blocked on backpressure.
            let sent = tokio::select! {
                biased;
                _ = ctx.stopped() => {
                    debug!(operator = %ctx.name(), emitted, "Source stopped");
                    return Ok(());
                }
                sent = tx.send(item) => sent,
            };
            if sent.is_err() {
                debug!(operator = %ctx.name(), emitted, "Downstream closed");
                return Ok(());
            }
            emitted += 1;
        }

        debug!(operator = %ctx.name(), emitted, "Source exhausted");
        Ok(())
    }
}

/// Forwards items from a caller-owned receiver until it closes.
pub struct ChannelSource<T> {
    name: String,
    source: mpsc::Receiver<T>,
    outlet: Outlet<T>,
}

impl<T> ChannelSource<T> {
    pub fn new(name: impl Into<String>, source: mpsc::Receiver<T>) -> Self {
        Self {
            name: name.into(),
            source,
            outlet: Outlet::new(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Operator<T> for ChannelSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<T>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<T>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            mut source,
            mut outlet,
            ..
        } = *self;
        let tx = outlet.take().map_err(OperatorError::failed)?;

        while let Some(item) = super::recv_or_stop(&mut source, &ctx).await {
            let sent = tokio::select! {
                biased;
                _ = ctx.stopped() => break,
                sent = tx.send(item) => sent,
            };
            if sent.is_err() {
                debug!(operator = %ctx.name(), "Downstream closed");
                break;
            }
        }

        debug!(operator = %ctx.name(), "Channel source finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wired<O: Operator<u32>>(mut op: O, slack: usize) -> (Box<O>, mpsc::Receiver<u32>) {
        let (tx, rx) = mpsc::channel(slack);
        op.as_outbound_mut().unwrap().set_out(tx).unwrap();
        (Box::new(op), rx)
    }

    #[tokio::test]
    async fn test_iter_source_emits_all_then_closes() {
        let (source, mut rx) = wired(IterSource::new("numbers", 0..5u32), 8);
        source.run(OperatorContext::detached("numbers")).await.unwrap();

        let mut seen = Vec::new();
        while let Some(item) = rx.recv().await {
            seen.push(item);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_iter_source_stops_when_blocked() {
        let (source, mut rx) = wired(IterSource::new("endless", 0u32..), 2);
        let ctx = OperatorContext::detached("endless");
        let stop = ctx.stop_token();

        let task = tokio::spawn(source.run(ctx));
        assert_eq!(rx.recv().await, Some(0));
        stop.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("source should stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_iter_source_without_output_fails() {
        let source = Box::new(IterSource::new("numbers", 0..3u32));
        let err = source.run(OperatorContext::detached("numbers")).await.unwrap_err();
        assert!(err.to_string().contains("output channel was never bound"));
    }

    #[tokio::test]
    async fn test_channel_source_forwards_until_closed() {
        let (feed, input) = mpsc::channel(4);
        let (source, mut rx) = wired(ChannelSource::new("feed", input), 4);

        let task = tokio::spawn(source.run(OperatorContext::detached("feed")));
        feed.send(7).await.unwrap();
        feed.send(8).await.unwrap();
        drop(feed);

        task.await.unwrap().unwrap();
        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, Some(8));
        assert_eq!(rx.recv().await, None);
    }
}
