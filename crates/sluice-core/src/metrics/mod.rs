//! Metrics emitted by chains and their runners.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `init_global`: installs the Prometheus recorder with its HTTP listener

pub mod events;

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::prelude::*;
use tracing::info;

use crate::error::{MetricsError, PrometheusInitSnafu};

/// Default metrics address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// Histogram buckets for chain durations (in seconds).
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0,
];

/// Macro for emitting metric events (Vector-style pattern).
///
/// ```ignore
/// use sluice_core::metrics::events::ChainStopped;
///
/// emit!(ChainStopped { chain: "ingest".into(), mode: StopMode::Soft });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Without an installed recorder every `emit!` is a no-op, so libraries and
/// tests never need to call this.
pub fn init_global(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install()
        .context(PrometheusInitSnafu)?;

    info!(%addr, "Metrics server started");
    Ok(())
}
