use crate::{JobId, JobPhase, JobResultKind};

/// Render-ready projection of the controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobViewModel {
    pub phase: JobPhase,
    /// The triggering control is disabled for the whole run and re-armed
    /// exactly once when the run reaches a terminal phase.
    pub control_enabled: bool,
    pub job_id: Option<JobId>,
    /// Append-only progress log, one entry per message unit.
    pub log: Vec<String>,
    /// Most recent log entry; the sink auto-scrolls to it.
    pub latest_line: Option<String>,
    pub result: Option<JobResultKind>,
    /// Upload variant only: percentage of bytes sent, when the total is known.
    pub upload_percent: Option<u8>,
}
