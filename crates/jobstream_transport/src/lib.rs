//! Jobstream transport: IO adapters and effect execution.
//!
//! Each adapter normalizes one browser-era transport (long-poll response
//! streaming, WebSocket job streaming, chunked file upload) into the shared
//! event contract consumed by the pure controller core.
mod event;
mod handle;
mod longpoll;
mod types;
mod upload;
mod websocket;

pub use event::{ChannelEventSink, EventSink, StreamTransport};
pub use handle::{JobSpec, TransportHandle};
pub use longpoll::{LongPollRequest, LongPollTransport};
pub use types::{JobId, TransportError, TransportEvent, TransportSettings};
pub use upload::{AbortFlag, FileUploader, UploadOutcome, UploadSource};
pub use websocket::{SentinelPredicate, TerminationPredicate, WebSocketTransport};
