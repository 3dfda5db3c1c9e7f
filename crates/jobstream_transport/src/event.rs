use tokio_util::sync::CancellationToken;

use crate::{JobId, TransportError, TransportEvent};

/// Consumer side of the adapter contract. Implementations must tolerate
/// being called from the runtime thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TransportEvent);
}

/// Sink backed by a std channel; the controller loop drains the receiver.
pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<TransportEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<TransportEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: TransportEvent) {
        let _ = self.tx.send(event);
    }
}

/// A chunk-producing transport. `run` drives the connection to completion,
/// emitting chunks as they arrive; a cancelled token tears the connection
/// down and returns cleanly. The caller converts the return value into the
/// final `Ended`/`Failed` event.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn run(
        &self,
        job_id: JobId,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError>;
}
