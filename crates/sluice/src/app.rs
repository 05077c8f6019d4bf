//! Builds and drives the line-processing chain.

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use sluice_core::operators::ParallelMap;
use sluice_core::{Chain, OrderedChain, SimpleChain, init_metrics, shutdown_signal};

use crate::config::{AppConfig, TransformConfig};
use crate::error::AppError;
use crate::lines::{LineSink, LineSource};

/// Run the configured chain from stdin to stdout.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    run_with(config, LineSource::stdin(), LineSink::stdout()).await
}

/// Run the configured chain between the given source and sink.
pub async fn run_with<R, W>(
    config: AppConfig,
    source: LineSource<R>,
    sink: LineSink<W>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    if config.metrics.enabled {
        init_metrics(config.metrics.socket_addr()?)?;
    }

    info!(
        chain = %config.chain.name,
        kind = ?config.transform.kind,
        workers = config.transform.workers,
        ordered = config.chain.ordered,
        "Building chain"
    );

    if config.chain.ordered {
        let mut chain = OrderedChain::from_config(&config.chain);
        build(&mut chain, &config.transform, source, sink)?;
        drive(chain).await
    } else {
        let mut chain = SimpleChain::from_config(&config.chain);
        build(&mut chain, &config.transform, source, sink)?;
        drive(chain).await
    }
}

fn build<C, R, W>(
    chain: &mut C,
    transform: &TransformConfig,
    source: LineSource<R>,
    sink: LineSink<W>,
) -> Result<(), AppError>
where
    C: Chain<String>,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let kind = transform.kind;
    chain
        .add(source)?
        .add(ParallelMap::new("transform", transform.workers, move |line: String| {
            Ok(kind.apply(line))
        }))?
        .add(sink)?;
    Ok(())
}

/// Start the chain, soft-stop it on the first shutdown signal and wait for it.
async fn drive<C: Chain<String>>(mut chain: C) -> Result<(), AppError> {
    chain.start()?;

    let handle = chain.stop_handle();
    let signals = tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal) => {
                info!(signal, "Draining chain");
                if let Err(e) = handle.soft_stop() {
                    warn!(error = %e, "Failed to stop chain");
                }
            }
            Err(e) => warn!(error = %e, "Failed to install signal handlers"),
        }
    });

    let result = chain.wait().await;
    signals.abort();

    result?;
    info!(chain = %chain.name(), "Chain finished");
    Ok(())
}
