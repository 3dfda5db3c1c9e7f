use jobstream_core::{Effect, Msg};
use jobstream_transport::{JobSpec, TransportEvent, TransportHandle, TransportSettings};
use stream_logging::stream_info;

/// Executes controller effects against the transport layer and converts
/// transport events back into controller messages.
pub struct EffectRunner {
    handle: TransportHandle,
    spec: JobSpec,
}

impl EffectRunner {
    pub fn new(spec: JobSpec) -> Self {
        Self {
            handle: TransportHandle::new(TransportSettings::default()),
            spec,
        }
    }

    pub fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTransport { job_id } => {
                    stream_info!("StartTransport job_id={job_id}");
                    self.handle.start(job_id, self.spec.clone());
                }
                Effect::CloseTransport { job_id } => {
                    self.handle.close(job_id);
                }
                Effect::AbortUpload { job_id } => {
                    stream_info!("AbortUpload job_id={job_id}");
                    self.handle.abort(job_id);
                }
            }
        }
    }

    pub fn try_recv_msg(&self) -> Option<Msg> {
        self.handle.try_recv().map(|event| match event {
            TransportEvent::Chunk { job_id, text } => Msg::ChunkArrived { job_id, text },
            TransportEvent::UploadProgress {
                job_id,
                sent,
                total,
            } => Msg::UploadProgress {
                job_id,
                sent,
                total,
            },
            TransportEvent::Ended { job_id } => Msg::TransportEnded { job_id },
            TransportEvent::Failed { job_id, error } => Msg::TransportFailed {
                job_id,
                detail: error.to_string(),
            },
        })
    }
}
