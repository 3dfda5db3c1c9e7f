#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the configured transport for a freshly created run.
    StartTransport { job_id: crate::JobId },
    /// Tear the transport down after termination was detected in content.
    /// The WebSocket adapter also closes itself on a sentinel hit; this
    /// covers adapters that missed it and the stall path.
    CloseTransport { job_id: crate::JobId },
    /// Set the cooperative abort flag on an in-flight upload.
    AbortUpload { job_id: crate::JobId },
}
