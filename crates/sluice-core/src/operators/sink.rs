use async_trait::async_trait;
use tracing::debug;

use super::recv_or_stop;
use crate::operator::{Inbound, Inlet, Operator, OperatorContext, OperatorError};

/// Terminal operator that hands every item to a closure.
pub struct ForEach<T, F> {
    name: String,
    f: F,
    inlet: Inlet<T>,
}

impl<T, F> ForEach<T, F>
where
    F: FnMut(T) -> Result<(), OperatorError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            inlet: Inlet::new(),
        }
    }
}

#[async_trait]
impl<T, F> Operator<T> for ForEach<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> Result<(), OperatorError> + Send + 'static,
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

    async fn run(self: Box<Self>, ctx: OperatorContext) -> Result<(), OperatorError> {
        let Self {
            mut f, mut inlet, ..
        } = *self;
        let mut rx = inlet.take().map_err(OperatorError::failed)?;

        let mut consumed = 0usize;
        while let Some(item) = recv_or_stop(&mut rx, &ctx).await {
            f(item)?;
            consumed += 1;
        }

        debug!(operator = %ctx.name(), consumed, "Sink finished");
        Ok(())
    }
}
