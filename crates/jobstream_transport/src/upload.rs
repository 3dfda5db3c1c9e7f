use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use stream_logging::stream_debug;

use crate::event::EventSink;
use crate::types::{map_reqwest_error, JobId, TransportError, TransportEvent, TransportSettings};

/// Cooperative cancellation flag for an in-flight upload, checked once per
/// body chunk. Cloned freely; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The file to upload: raw bytes plus the content type forwarded verbatim
/// in the request header.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub bytes: Bytes,
    pub content_type: String,
}

/// How an upload run resolved. An abort is a resolution, not an error: the
/// response text gathered by abort time is passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed { body: String },
    Aborted { body: String },
}

/// Single-request PUT uploader with chunk-wise progress reporting.
/// Success is HTTP 200 exactly; any other status is an error carrying the
/// raw response text. No retry at this layer.
pub struct FileUploader {
    settings: TransportSettings,
}

impl FileUploader {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    pub async fn upload(
        &self,
        job_id: JobId,
        url: &str,
        source: UploadSource,
        sink: Arc<dyn EventSink>,
        abort: AbortFlag,
    ) -> Result<UploadOutcome, TransportError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        let mut builder = reqwest::Client::builder().connect_timeout(self.settings.connect_timeout);
        if let Some(timeout) = self.settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let total = source.bytes.len() as u64;
        let chunk_size = self.settings.upload_chunk_size.max(1);
        let mut rest = source.bytes.clone();
        let mut chunks = Vec::new();
        while !rest.is_empty() {
            let take = rest.len().min(chunk_size);
            chunks.push(rest.split_to(take));
        }

        let progress_sink = sink.clone();
        let flag = abort.clone();
        let mut sent = 0u64;
        let body_stream = futures_util::stream::iter(chunks).map(move |chunk| {
            if flag.is_set() {
                // Tearing the body stream down aborts the request; the
                // caller maps that failure back to a clean abort below.
                return Err(std::io::Error::other("upload aborted"));
            }
            sent += chunk.len() as u64;
            progress_sink.emit(TransportEvent::UploadProgress {
                job_id,
                sent,
                total: Some(total),
            });
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let result = client
            .put(parsed)
            .header(CONTENT_TYPE, &source.content_type)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(_) if abort.is_set() => {
                stream_debug!("upload aborted job_id={job_id} sent<{total}");
                return Ok(UploadOutcome::Aborted {
                    body: String::new(),
                });
            }
            Err(err) => return Err(map_reqwest_error(err)),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if abort.is_set() {
            return Ok(UploadOutcome::Aborted { body });
        }
        if status.as_u16() == 200 {
            Ok(UploadOutcome::Completed { body })
        } else {
            Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}
