#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User clicked the (enabled) triggering control to start a run.
    SubmitClicked,
    /// User asked to cancel the in-flight run (upload variant).
    CancelClicked,
    /// Transport delivered a piece of payload text.
    ChunkArrived {
        job_id: crate::JobId,
        text: String,
    },
    /// Upload transport reported bytes sent so far.
    UploadProgress {
        job_id: crate::JobId,
        sent: u64,
        total: Option<u64>,
    },
    /// Transport finished on its own.
    TransportEnded { job_id: crate::JobId },
    /// Transport-level failure (network, socket, bad status).
    TransportFailed {
        job_id: crate::JobId,
        detail: String,
    },
    /// Periodic controller tick; drives stall detection.
    PollTick,
    /// Fallback for placeholder wiring.
    NoOp,
}
