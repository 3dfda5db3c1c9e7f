use futures_util::StreamExt;
use stream_logging::stream_debug;
use tokio_util::sync::CancellationToken;

use crate::event::{EventSink, StreamTransport};
use crate::types::{map_reqwest_error, JobId, TransportError, TransportEvent, TransportSettings};

/// The one request a long-poll run issues: a form-encoded POST whose
/// response body grows for as long as the job runs server-side.
#[derive(Debug, Clone)]
pub struct LongPollRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
}

/// Streams the accumulating response body of a single POST. The connection
/// deliberately has no request timeout; only the connect phase is bounded.
/// Stall detection lives in the controller, not here.
pub struct LongPollTransport {
    settings: TransportSettings,
    request: LongPollRequest,
}

impl LongPollTransport {
    pub fn new(settings: TransportSettings, request: LongPollRequest) -> Self {
        Self { settings, request }
    }
}

#[async_trait::async_trait]
impl StreamTransport for LongPollTransport {
    async fn run(
        &self,
        job_id: JobId,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let parsed = reqwest::Url::parse(&self.request.url)
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        // request_timeout is deliberately not applied: the poll connection
        // lives as long as the job does. Only the connect phase is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = client.post(parsed).form(&self.request.form).send() => {
                result.map_err(map_reqwest_error)?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        stream_debug!("long poll open job_id={job_id} status={status}");

        let mut carry = Utf8Carry::default();
        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        let text = carry.push(&bytes);
                        if !text.is_empty() {
                            sink.emit(TransportEvent::Chunk { job_id, text });
                        }
                    }
                    Some(Err(err)) => return Err(map_reqwest_error(err)),
                    None => {
                        stream_debug!("long poll closed job_id={job_id}");
                        return Ok(());
                    }
                },
            }
        }
    }
}

/// Reassembles UTF-8 text from byte chunks whose boundaries can split a
/// multi-byte character. An incomplete trailing sequence is held back until
/// the next chunk arrives.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let out = text.to_owned();
                self.pending.clear();
                out
            }
            Err(err) if err.error_len().is_none() => {
                // Split character at the end; emit the valid prefix only.
                let tail = self.pending.split_off(err.valid_up_to());
                let out = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending = tail;
                out
            }
            Err(_) => {
                // Malformed bytes mid-stream; decode lossily and move on.
                let out = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Utf8Carry;

    #[test]
    fn carry_holds_back_a_split_character() {
        let mut carry = Utf8Carry::default();
        let text = "héllo".as_bytes();

        // 'é' is two bytes; split in the middle of it.
        assert_eq!(carry.push(&text[..2]), "h");
        assert_eq!(carry.push(&text[2..]), "éllo");
    }

    #[test]
    fn carry_passes_plain_ascii_through() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(b"abc"), "abc");
        assert_eq!(carry.push(b""), "");
    }

    #[test]
    fn carry_recovers_from_malformed_bytes() {
        let mut carry = Utf8Carry::default();
        let out = carry.push(&[0x61, 0xff, 0x62]);
        assert!(out.starts_with('a'));
        assert!(out.ends_with('b'));
        assert_eq!(carry.push(b"ok"), "ok");
    }
}
