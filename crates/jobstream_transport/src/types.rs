use std::time::Duration;

use thiserror::Error;

pub type JobId = u64;

/// Uniform event contract every adapter reduces to: payload chunks while the
/// transport is live, then exactly one `Ended` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A piece of payload text arrived. Long-poll delivers body deltas,
    /// WebSocket one decoded frame per event; uploads do not use it except
    /// to pass the final response body through.
    Chunk { job_id: JobId, text: String },
    /// Upload only: cumulative bytes handed to the connection. The count
    /// advances as the request body is consumed, so it can run ahead of
    /// what actually reached the server; it is not an acknowledgement.
    UploadProgress {
        job_id: JobId,
        sent: u64,
        total: Option<u64>,
    },
    /// The transport finished without a transport-level error.
    Ended { job_id: JobId },
    /// Transport-level failure; no automatic retry happens at this layer.
    Failed {
        job_id: JobId,
        error: TransportError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("socket error: {0}")]
    Socket(String),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Overall request bound for bounded transports (uploads). Long-poll
    /// connections stay open for the job's lifetime and never apply it.
    pub request_timeout: Option<Duration>,
    /// Slice size for streamed upload bodies; one progress event per slice.
    pub upload_chunk_size: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            upload_chunk_size: 64 * 1024,
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(err.to_string());
    }
    TransportError::Network(err.to_string())
}
