//! Integration tests for sluice-core chains

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sluice_core::operators::{ChannelSource, ForEach, IterSource, Map, ParallelMap};
use sluice_core::{
    Chain, ChainError, InChain, Inbound, Inlet, Operator, OperatorContext, OperatorError, OrderedChain,
    Outbound, Outlet, SimpleChain, new_chain,
};
use tokio::sync::mpsc;

const GUARD: Duration = Duration::from_secs(5);

fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) -> Result<(), OperatorError>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink = move |item: T| {
        sink_seen.lock().unwrap().push(item);
        Ok(())
    };
    (seen, sink)
}

/// Source that emits nothing and records how it was told to stop.
struct StopRecorder {
    outlet: Outlet<u32>,
    seen: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Operator<u32> for StopRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<u32>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        ctx.stopped().await;
        let kind = if ctx.is_hard_stopped() { "hard" } else { "soft" };
        self.seen.lock().unwrap().push(kind);
        Ok(())
    }
}

/// Transform that keeps running for a while after a hard stop.
struct Lingering {
    done: Arc<Mutex<bool>>,
    outlet: Outlet<u32>,
    inlet: Inlet<u32>,
}

#[async_trait]
impl Operator<u32> for Lingering {
    fn name(&self) -> &str {
        "lingering"
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<u32>> {
        Some(&mut self.inlet)
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<u32>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<u32>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        ctx.hard_stopped().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        *self.done.lock().unwrap() = true;
        Ok(())
    }
}

mod wiring_tests {
    use super::*;

    #[test]
    fn test_adjacent_operators_share_one_channel() {
        let mut chain = SimpleChain::<u32>::with_slack(8);
        chain
            .add(IterSource::new("source", 0..3u32))
            .unwrap()
            .add(Map::new("transform", |x: u32| Ok(x)))
            .unwrap()
            .add(ForEach::new("sink", |_: u32| Ok(())))
            .unwrap();

        let ops = chain.operators();
        let source = ops[0].operator().unwrap();
        let transform = ops[1].operator().unwrap();
        let sink = ops[2].operator().unwrap();

        // Whatever enters the source's output shows up queued on the transform's input.
        let source_out = source.as_outbound().unwrap().output().unwrap();
        assert_eq!(transform.as_inbound().unwrap().in_depth(), 0);
        source_out.try_send(1).unwrap();
        assert_eq!(transform.as_inbound().unwrap().in_depth(), 1);

        let transform_out = transform.as_outbound().unwrap().output().unwrap();
        transform_out.try_send(2).unwrap();
        transform_out.try_send(3).unwrap();
        assert_eq!(sink.as_inbound().unwrap().in_depth(), 2);

        assert!(source.as_inbound().is_none());
        assert!(sink.as_outbound().is_none());
    }

    #[test]
    fn test_output_channels_use_configured_slack() {
        let mut chain = SimpleChain::<u32>::with_slack(5);
        chain
            .add(IterSource::new("source", 0..3u32))
            .unwrap()
            .add(Map::new("transform", |x: u32| Ok(x)))
            .unwrap();

        for slot in chain.operators() {
            let out = slot.operator().unwrap().as_outbound().unwrap().output().unwrap();
            assert_eq!(out.max_capacity(), 5);
        }
    }

    #[test]
    fn test_default_slack() {
        let mut chain = new_chain::<u32>();
        chain.add(IterSource::new("source", 0..3u32)).unwrap();

        let out = chain.operators()[0]
            .operator()
            .unwrap()
            .as_outbound()
            .unwrap()
            .output()
            .unwrap();
        assert_eq!(out.max_capacity(), sluice_core::CHAN_SLACK);
    }

    #[tokio::test]
    async fn test_add_after_start_is_rejected() {
        let (seen, sink) = collector::<u32>();
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(IterSource::new("source", 0..3u32))
            .unwrap()
            .add(Map::new("transform", |x: u32| Ok(x)))
            .unwrap();
        chain.start().unwrap();

        let err = chain.add(ForEach::new("sink", sink)).unwrap_err();
        assert!(matches!(err, ChainError::AlreadyStarted { .. }));
        assert!(matches!(chain.start(), Err(ChainError::AlreadyStarted { .. })));

        // The transform's output was never consumed; drain it so the chain can finish.
        let mut output = chain.take_output().unwrap();
        let drain = tokio::spawn(async move { while output.recv().await.is_some() {} });
        tokio::time::timeout(GUARD, chain.wait()).await.unwrap().unwrap();
        drain.await.unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_normal_termination_returns_ok() {
        let (seen, sink) = collector::<u32>();
        let mut chain = SimpleChain::<u32>::new();
        chain
            .set_name("numbers")
            .add(IterSource::new("source", 0..20u32))
            .unwrap()
            .add(Map::new("transform", |x: u32| Ok(x * 2)))
            .unwrap()
            .add(ForEach::new("sink", sink))
            .unwrap();

        tokio::time::timeout(GUARD, chain.run()).await.unwrap().unwrap();

        let expected: Vec<u32> = (0..20).map(|x| x * 2).collect();
        assert_eq!(*seen.lock().unwrap(), expected);
        assert!(chain.stop_handle().is_stop_sent());
    }

    #[tokio::test]
    async fn test_failing_transform_hard_stops_chain() {
        let (seen, sink) = collector::<u32>();
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(Map::new("transform", |x: u32| {
                if x == 5 {
                    Err(OperatorError::msg("cannot handle five"))
                } else {
                    Ok(x)
                }
            }))
            .unwrap()
            .add(ForEach::new("sink", sink))
            .unwrap();

        let err = tokio::time::timeout(GUARD, chain.run()).await.unwrap().unwrap_err();

        match &err {
            ChainError::OperatorFailed { operator, .. } => assert_eq!(operator, "transform"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.operator_error().unwrap().to_string().contains("cannot handle five"));
        assert!(seen.lock().unwrap().iter().all(|&x| x < 5));
    }

    #[tokio::test]
    async fn test_wait_returns_only_after_every_operator_finished() {
        let done = Arc::new(Mutex::new(false));
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(Lingering {
                done: done.clone(),
                outlet: Outlet::new(),
                inlet: Inlet::new(),
            })
            .unwrap()
            .add(Map::new("broken", |_: u32| Err(OperatorError::msg("broken"))))
            .unwrap()
            .add(ForEach::new("sink", |_: u32| Ok(())))
            .unwrap();

        // Feed "broken" directly since "lingering" never forwards anything.
        let lingering_out = chain.operators()[1]
            .operator()
            .unwrap()
            .as_outbound()
            .unwrap()
            .output()
            .unwrap()
            .clone();
        lingering_out.try_send(1).unwrap();

        let result = tokio::time::timeout(GUARD, chain.run()).await.unwrap();
        assert!(matches!(result, Err(ChainError::OperatorFailed { .. })));
        assert!(*done.lock().unwrap(), "wait returned before the lingering operator finished");
    }

    #[tokio::test]
    async fn test_soft_stop_drains_from_the_source() {
        let (seen, sink) = collector::<u32>();
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(Map::new("transform", |x: u32| Ok(x)))
            .unwrap()
            .add(ForEach::new("sink", sink))
            .unwrap();

        chain.start().unwrap();
        let handle = chain.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.soft_stop().unwrap();
        });

        tokio::time::timeout(GUARD, chain.wait()).await.unwrap().unwrap();

        // Everything the source emitted reached the sink, in order.
        let seen = seen.lock().unwrap();
        assert!(seen.iter().copied().eq(0..seen.len() as u32));
    }

    #[tokio::test]
    async fn test_hard_stop_from_another_task() {
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(ForEach::new("sink", |_: u32| Ok(())))
            .unwrap();

        chain.start().unwrap();
        let handle = chain.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.stop().unwrap();
        });

        tokio::time::timeout(GUARD, chain.wait()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_repeated_stops_dispatch_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chain = SimpleChain::<u32>::new();
        chain
            .add(StopRecorder {
                outlet: Outlet::new(),
                seen: seen.clone(),
            })
            .unwrap()
            .add(ForEach::new("sink", |_: u32| Ok(())))
            .unwrap();

        chain.start().unwrap();
        for _ in 0..3 {
            chain.soft_stop().unwrap();
        }
        chain.stop().unwrap();
        chain.stop().unwrap();

        tokio::time::timeout(GUARD, chain.wait()).await.unwrap().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["soft"]);
    }

    #[tokio::test]
    async fn test_channel_source_feeds_chain() {
        let (feed, input) = mpsc::channel(4);
        let (seen, sink) = collector::<String>();
        let mut chain = SimpleChain::<String>::new();
        chain
            .add(ChannelSource::new("feed", input))
            .unwrap()
            .add(Map::new("shout", |s: String| Ok(s.to_uppercase())))
            .unwrap()
            .add(ForEach::new("sink", sink))
            .unwrap();

        chain.start().unwrap();
        feed.send("a".to_string()).await.unwrap();
        feed.send("b".to_string()).await.unwrap();
        drop(feed);

        tokio::time::timeout(GUARD, chain.wait()).await.unwrap().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["A", "B"]);
    }
}

mod ordered_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ordered_chain_preserves_input_order() {
        let mut chain = OrderedChain::<u64>::new();
        chain
            .add(IterSource::new("source", 0..40u64))
            .unwrap()
            .add(ParallelMap::new("jitter", 8, |x: u64| {
                std::thread::sleep(Duration::from_millis((x * 7) % 11));
                Ok(x)
            }))
            .unwrap();

        let mut output = chain.take_output().unwrap();
        let collect = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(item) = output.recv().await {
                seen.push(item);
            }
            seen
        });

        tokio::time::timeout(GUARD, chain.run()).await.unwrap().unwrap();
        let seen = collect.await.unwrap();
        assert_eq!(seen, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_ordered_chain_rejects_unorderable_operator() {
        let mut chain = OrderedChain::<u32>::new();
        chain.add(IterSource::new("source", 0..3u32)).unwrap();

        let err = chain
            .add(ParallelMap::unorderable("shuffle", 2, |x: u32| Ok(x)))
            .unwrap_err();
        assert!(matches!(err, ChainError::Unordered { .. }));
    }
}

mod nesting_tests {
    use super::*;

    fn branch(sink: impl FnMut(u32) -> Result<(), OperatorError> + Send + 'static) -> SimpleChain<u32> {
        let mut inner = SimpleChain::<u32>::new();
        inner
            .set_name("branch")
            .add(Map::new("inc", |x: u32| Ok(x + 1)))
            .unwrap()
            .add(ForEach::new("sink", sink))
            .unwrap();
        inner
    }

    #[test]
    fn test_in_chain_forwards_to_first_operator() {
        let mut wrapped = InChain::new(branch(|_| Ok(()))).unwrap();
        let (tx, rx) = mpsc::channel(4);
        wrapped.set_in(rx).unwrap();

        tx.try_send(10).unwrap();
        let first = wrapped.chain().operators()[0].operator().unwrap();
        assert_eq!(first.as_inbound().unwrap().in_depth(), 1);
        assert_eq!(wrapped.in_depth(), 1);
    }

    #[tokio::test]
    async fn test_nested_chain_runs_inside_outer_chain() {
        let (seen, sink) = collector::<u32>();
        let mut outer = SimpleChain::<u32>::new();
        outer
            .set_name("outer")
            .add(IterSource::new("source", 0..10u32))
            .unwrap()
            .add(InChain::new(branch(sink)).unwrap())
            .unwrap();

        tokio::time::timeout(GUARD, outer.run()).await.unwrap().unwrap();
        assert_eq!(*seen.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_nested_failure_fails_outer_chain() {
        let mut inner = SimpleChain::<u32>::new();
        inner
            .set_name("branch")
            .add(Map::new("reject", |_: u32| Err(OperatorError::msg("rejected"))))
            .unwrap()
            .add(ForEach::new("sink", |_: u32| Ok(())))
            .unwrap();

        let mut outer = SimpleChain::<u32>::new();
        outer
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(InChain::new(inner).unwrap())
            .unwrap();

        let err = tokio::time::timeout(GUARD, outer.run()).await.unwrap().unwrap_err();
        assert!(matches!(err, ChainError::OperatorFailed { ref operator, .. } if operator == "branch"));
    }

    #[tokio::test]
    async fn test_outer_hard_stop_reaches_nested_chain() {
        let mut outer = SimpleChain::<u32>::new();
        outer
            .add(IterSource::new("source", 0u32..))
            .unwrap()
            .add(InChain::new(branch(|_| Ok(()))).unwrap())
            .unwrap();

        outer.start().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        outer.stop().unwrap();

        tokio::time::timeout(GUARD, outer.wait()).await.unwrap().unwrap();
    }
}
