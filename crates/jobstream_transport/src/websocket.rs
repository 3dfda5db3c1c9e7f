use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use stream_logging::stream_debug;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::event::{EventSink, StreamTransport};
use crate::types::{JobId, TransportError, TransportEvent};

/// Decides, per decoded frame, whether the job is over. Kept behind a trait
/// so structured (JSON) and tagged-text protocols share the same adapter.
pub trait TerminationPredicate: Send + Sync {
    fn matches(&self, frame: &str) -> bool;
}

/// Case-insensitive substring match against caller-supplied done/error
/// sentinels. Both sentinels end the stream; the controller decides which
/// outcome the matching sentinel implies.
#[derive(Debug, Clone)]
pub struct SentinelPredicate {
    done: String,
    error: String,
}

impl SentinelPredicate {
    pub fn new(done: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            done: done.into().to_lowercase(),
            error: error.into().to_lowercase(),
        }
    }
}

impl TerminationPredicate for SentinelPredicate {
    fn matches(&self, frame: &str) -> bool {
        let lowered = frame.to_lowercase();
        (!self.done.is_empty() && lowered.contains(&self.done))
            || (!self.error.is_empty() && lowered.contains(&self.error))
    }
}

/// Streams a server-push WebSocket. The server sends JSON-encoded messages;
/// each decoded frame is one chunk. When the predicate matches a frame the
/// adapter closes the socket itself; the caller never has to.
pub struct WebSocketTransport {
    url: String,
    predicate: Arc<dyn TerminationPredicate>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, predicate: Arc<dyn TerminationPredicate>) -> Self {
        Self {
            url: url.into(),
            predicate,
        }
    }
}

#[async_trait::async_trait]
impl StreamTransport for WebSocketTransport {
    async fn run(
        &self,
        job_id: JobId,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme {other}"
                )))
            }
        }

        let (mut socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::Handshake(err.to_string()))?;
        stream_debug!("websocket open job_id={job_id}");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = socket.send(Message::Close(None)).await;
                    stream_debug!("websocket close job_id={job_id} (cancelled)");
                    return Ok(());
                }
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(raw))) => {
                        let text = decode_frame(raw.as_str());
                        let done = self.predicate.matches(&text);
                        sink.emit(TransportEvent::Chunk { job_id, text });
                        if done {
                            let _ = socket.send(Message::Close(None)).await;
                            stream_debug!("websocket close job_id={job_id} (terminated)");
                            return Ok(());
                        }
                    }
                    // Server closed without a sentinel; the controller's end
                    // policy decides what that means.
                    Some(Ok(Message::Close(_))) | None => {
                        stream_debug!("websocket close job_id={job_id}");
                        return Ok(());
                    }
                    // Control frames and binary payloads carry no job output.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(TransportError::Socket(err.to_string())),
                },
            }
        }
    }
}

/// Frames are JSON-encoded; a JSON string becomes its inner text, any other
/// value is rendered back to its JSON form. Frames that fail to parse pass
/// through verbatim.
fn decode_frame(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, SentinelPredicate, TerminationPredicate};

    #[test]
    fn json_string_frames_decode_to_their_text() {
        assert_eq!(decode_frame("\"item 4 of 9\""), "item 4 of 9");
    }

    #[test]
    fn structured_frames_render_back_to_json() {
        assert_eq!(
            decode_frame("{\"stage\": \"ingest\", \"count\": 3}"),
            "{\"count\":3,\"stage\":\"ingest\"}"
        );
    }

    #[test]
    fn unparseable_frames_pass_through() {
        assert_eq!(decode_frame("plain text"), "plain text");
    }

    #[test]
    fn predicate_matches_either_sentinel_case_insensitively() {
        let predicate = SentinelPredicate::new("Done: harvest", "Error: harvest");
        assert!(predicate.matches("done: HARVEST complete"));
        assert!(predicate.matches("fatal -> ERROR: harvest failed"));
        assert!(!predicate.matches("harvesting item 12"));
    }

    #[test]
    fn empty_sentinels_never_match() {
        let predicate = SentinelPredicate::new("", "");
        assert!(!predicate.matches("anything at all"));
    }
}
