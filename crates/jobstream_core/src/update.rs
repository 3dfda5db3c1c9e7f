use crate::{Effect, JobPhase, JobState, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Lifecycle: `Idle -> Running -> {Completed, Failed}`. The terminal phases
/// hold until a new user submission constructs a fresh run; transport events
/// for a finished or superseded run are dropped here.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitClicked => {
            if state.phase() == JobPhase::Running {
                // Control is disabled while a run is pending; a second
                // submission is a no-op.
                Vec::new()
            } else {
                let job_id = state.begin_run();
                vec![Effect::StartTransport { job_id }]
            }
        }
        Msg::CancelClicked => match state.active_job_id() {
            Some(job_id) if state.phase() == JobPhase::Running => {
                // The run stays Running until the transport reports the
                // abort back as an end-of-stream event.
                vec![Effect::AbortUpload { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::ChunkArrived { job_id, text } => {
            if state.phase() != JobPhase::Running || !state.is_current(job_id) {
                return (state, Vec::new());
            }
            match state.absorb_chunk(&text) {
                Some(_result) => vec![Effect::CloseTransport { job_id }],
                None => Vec::new(),
            }
        }
        Msg::UploadProgress {
            job_id,
            sent,
            total,
        } => {
            if state.phase() == JobPhase::Running && state.is_current(job_id) {
                state.apply_upload_progress(sent, total);
            }
            Vec::new()
        }
        Msg::TransportEnded { job_id } => {
            if state.phase() == JobPhase::Running && state.is_current(job_id) {
                state.end_of_stream();
            }
            Vec::new()
        }
        Msg::TransportFailed { job_id, detail } => {
            if state.phase() == JobPhase::Running && state.is_current(job_id) {
                state.fail_transport(&detail);
            }
            Vec::new()
        }
        Msg::PollTick => {
            if state.phase() == JobPhase::Running && state.note_poll_tick() {
                match state.active_job_id() {
                    Some(job_id) => vec![Effect::CloseTransport { job_id }],
                    None => Vec::new(),
                }
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
