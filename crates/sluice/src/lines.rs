//! Line-oriented entry and exit operators.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::debug;

use sluice_core::{Inbound, Inlet, Operator, OperatorContext, OperatorError, Outbound, Outlet};

/// Emits each line of a reader, without its terminator.
pub struct LineSource<R> {
    name: String,
    reader: R,
    outlet: Outlet<String>,
}

impl<R> LineSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            outlet: Outlet::new(),
        }
    }
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> Operator<String> for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_outbound(&self) -> Option<&dyn Outbound<String>> {
        Some(&self.outlet)
    }

    fn as_outbound_mut(&mut self) -> Option<&mut dyn Outbound<String>> {
        Some(&mut self.outlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            reader, mut outlet, ..
        } = *self;
        let tx = outlet.take().map_err(OperatorError::failed)?;
        let mut lines = reader.lines();

        let mut read = 0usize;
        loop {
            let line = tokio::select! {
                biased;
                _ = ctx.stopped() => break,
                line = lines.next_line() => line.map_err(OperatorError::failed)?,
            };
            let Some(line) = line else {
                break;
            };

            let sent = tokio::select! {
                biased;
                _ = ctx.stopped() => break,
                sent = tx.send(line) => sent,
            };
            if sent.is_err() {
                break;
            }
            read += 1;
        }

        debug!(operator = %ctx.name(), lines = read, "Line source finished");
        Ok(())
    }
}

/// Writes every item as a line and flushes once its input is exhausted.
pub struct LineSink<W> {
    name: String,
    writer: W,
    inlet: Inlet<String>,
}

impl<W> LineSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            inlet: Inlet::new(),
        }
    }
}

impl LineSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", tokio::io::stdout())
    }
}

#[async_trait]
impl<W> Operator<String> for LineSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_inbound(&self) -> Option<&dyn Inbound<String>> {
        Some(&self.inlet)
    }

    fn as_inbound_mut(&mut self) -> Option<&mut dyn Inbound<String>> {
        Some(&mut self.inlet)
    }

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            mut writer,
            mut inlet,
            ..
        } = *self;
        let mut rx = inlet.take().map_err(OperatorError::failed)?;

        loop {
            let line = tokio::select! {
                biased;
                _ = ctx.stopped() => break,
                line = rx.recv() => line,
            };
            let Some(line) = line else {
                break;
            };
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(OperatorError::failed)?;
            writer.write_all(b"\n").await.map_err(OperatorError::failed)?;
        }

        writer.flush().await.map_err(OperatorError::failed)?;
        debug!(operator = %ctx.name(), "Line sink finished");
        Ok(())
    }
}
