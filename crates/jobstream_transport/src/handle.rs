use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use stream_logging::{stream_debug, stream_warn};
use tokio_util::sync::CancellationToken;

use crate::event::{ChannelEventSink, EventSink, StreamTransport};
use crate::longpoll::{LongPollRequest, LongPollTransport};
use crate::types::{JobId, TransportEvent, TransportSettings};
use crate::upload::{AbortFlag, FileUploader, UploadOutcome, UploadSource};
use crate::websocket::{SentinelPredicate, WebSocketTransport};

/// Which transport a run uses, with everything that run needs to open it.
#[derive(Debug, Clone)]
pub enum JobSpec {
    LongPoll {
        url: String,
        form: Vec<(String, String)>,
    },
    WebSocket {
        url: String,
        done: String,
        error: String,
    },
    Upload { url: String, source: UploadSource },
}

enum Command {
    Start { job_id: JobId, spec: JobSpec },
    Abort { job_id: JobId },
    Close { job_id: JobId },
}

#[derive(Clone)]
struct JobControl {
    cancel: CancellationToken,
    abort: AbortFlag,
}

type ActiveJobs = Arc<Mutex<HashMap<JobId, JobControl>>>;

/// Owns the runtime thread that executes transports. Commands go in over a
/// channel; `TransportEvent`s come back out for the controller loop to
/// drain with `try_recv`. Events for one job arrive in order.
pub struct TransportHandle {
    cmd_tx: mpsc::Sender<Command>,
    event_rx: mpsc::Receiver<TransportEvent>,
}

impl TransportHandle {
    pub fn new(settings: TransportSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let active: ActiveJobs = Arc::new(Mutex::new(HashMap::new()));
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    Command::Start { job_id, spec } => {
                        let control = JobControl {
                            cancel: CancellationToken::new(),
                            abort: AbortFlag::new(),
                        };
                        active
                            .lock()
                            .expect("lock active jobs")
                            .insert(job_id, control.clone());
                        let event_tx = event_tx.clone();
                        let active = active.clone();
                        let settings = settings.clone();
                        runtime.spawn(async move {
                            run_job(job_id, spec, settings, control, event_tx).await;
                            active.lock().expect("lock active jobs").remove(&job_id);
                        });
                    }
                    Command::Abort { job_id } => {
                        match active.lock().expect("lock active jobs").get(&job_id) {
                            Some(control) => control.abort.set(),
                            None => stream_warn!("abort for unknown job_id={job_id}"),
                        }
                    }
                    Command::Close { job_id } => {
                        // Already-finished jobs are gone from the registry;
                        // a late close is expected and harmless.
                        if let Some(control) =
                            active.lock().expect("lock active jobs").get(&job_id)
                        {
                            control.cancel.cancel();
                        }
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self, job_id: JobId, spec: JobSpec) {
        let _ = self.cmd_tx.send(Command::Start { job_id, spec });
    }

    pub fn abort(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(Command::Abort { job_id });
    }

    pub fn close(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(Command::Close { job_id });
    }

    pub fn try_recv(&self) -> Option<TransportEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn run_job(
    job_id: JobId,
    spec: JobSpec,
    settings: TransportSettings,
    control: JobControl,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx.clone()));
    stream_debug!("transport start job_id={job_id}");

    let result = match spec {
        JobSpec::LongPoll { url, form } => {
            let transport = LongPollTransport::new(settings, LongPollRequest { url, form });
            transport.run(job_id, sink.as_ref(), &control.cancel).await
        }
        JobSpec::WebSocket { url, done, error } => {
            let predicate = Arc::new(SentinelPredicate::new(done, error));
            let transport = WebSocketTransport::new(url, predicate);
            transport.run(job_id, sink.as_ref(), &control.cancel).await
        }
        JobSpec::Upload { url, source } => {
            let uploader = FileUploader::new(settings);
            uploader
                .upload(job_id, &url, source, sink.clone(), control.abort.clone())
                .await
                .map(|outcome| {
                    // The response body (complete or abort-time) is passed
                    // through as one final chunk for the log.
                    let (UploadOutcome::Completed { body }
                    | UploadOutcome::Aborted { body }) = outcome;
                    if !body.is_empty() {
                        sink.emit(TransportEvent::Chunk { job_id, text: body });
                    }
                })
        }
    };

    match result {
        Ok(()) => {
            stream_debug!("transport end job_id={job_id}");
            let _ = event_tx.send(TransportEvent::Ended { job_id });
        }
        Err(error) => {
            stream_warn!("transport failed job_id={job_id}: {error}");
            let _ = event_tx.send(TransportEvent::Failed { job_id, error });
        }
    }
}
