use std::fmt;

use crate::extract::{FragmentExtractor, Framing};
use crate::sentinel::{SentinelSet, TerminationMarker};
use crate::view_model::JobViewModel;

pub type JobId = u64;

/// Fixed, non-localized line appended to the log when the transport fails.
pub const FAILURE_LOG_LINE: &str = "*** transport failure, job aborted ***";

/// Line appended when the stream stalls past the configured limit.
pub const STALL_LOG_LINE: &str = "*** no progress from server, giving up ***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// How a finished run ended. `ServerError` is a successful protocol exchange
/// whose content matched the error sentinel; only the caller treats it as a
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResultKind {
    Done,
    ServerError,
    TransportError,
    Stalled,
}

impl fmt::Display for JobResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResultKind::Done => write!(f, "done"),
            JobResultKind::ServerError => write!(f, "server reported error"),
            JobResultKind::TransportError => write!(f, "transport error"),
            JobResultKind::Stalled => write!(f, "stalled"),
        }
    }
}

/// What an end-of-stream event means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPolicy {
    /// The transport finishing is the success signal (upload variant).
    CompleteOnEnd,
    /// The stream must terminate via a sentinel first; an early end is a
    /// transport failure (long-poll and WebSocket variants).
    FailIfUnterminated,
}

/// Policy for a stream whose delimiter never arrives. The source behaviour
/// is to wait forever; callers that want a bound configure a tick limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StallPolicy {
    #[default]
    WaitForever,
    /// Fail the run after this many consecutive poll ticks without a single
    /// extracted unit.
    FailAfterTicks(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub framing: Framing,
    pub sentinels: SentinelSet,
    pub end_policy: EndPolicy,
    pub stall_policy: StallPolicy,
}

impl JobConfig {
    /// Long-poll variant: delimited fragments out of a growing response body.
    pub fn long_poll(end_delimiter: impl Into<String>, sentinels: SentinelSet) -> Self {
        Self {
            framing: Framing::Delimited {
                end: end_delimiter.into(),
            },
            sentinels,
            end_policy: EndPolicy::FailIfUnterminated,
            stall_policy: StallPolicy::default(),
        }
    }

    /// WebSocket variant: one frame per unit, sentinel-terminated.
    pub fn web_socket(sentinels: SentinelSet) -> Self {
        Self {
            framing: Framing::FramePerChunk,
            sentinels,
            end_policy: EndPolicy::FailIfUnterminated,
            stall_policy: StallPolicy::default(),
        }
    }

    /// Upload variant: no payload chunks, progress ticks only; the transport
    /// finishing is the completion signal.
    pub fn upload() -> Self {
        Self {
            framing: Framing::FramePerChunk,
            sentinels: SentinelSet::new("", ""),
            end_policy: EndPolicy::CompleteOnEnd,
            stall_policy: StallPolicy::default(),
        }
    }

    pub fn with_stall_policy(mut self, policy: StallPolicy) -> Self {
        self.stall_policy = policy;
        self
    }
}

/// One execution of a monitored long-running operation. Owns the accumulated
/// buffer and the extractor cursor; discarded when the control is re-armed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JobRun {
    job_id: JobId,
    buffer: String,
    extractor: FragmentExtractor,
    log: Vec<String>,
    marker: TerminationMarker,
    result: Option<JobResultKind>,
    stall_ticks: u32,
    upload_percent: Option<u8>,
}

impl JobRun {
    fn new(job_id: JobId, framing: Framing) -> Self {
        Self {
            job_id,
            buffer: String::new(),
            extractor: FragmentExtractor::new(framing),
            log: Vec::new(),
            marker: TerminationMarker::None,
            result: None,
            stall_ticks: 0,
            upload_percent: None,
        }
    }
}

/// Pure controller state for one triggering control. At most one run is
/// active at a time; a submission while `Running` is a no-op because the
/// control is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    config: JobConfig,
    phase: JobPhase,
    run: Option<JobRun>,
    next_job_id: JobId,
    dirty: bool,
}

impl JobState {
    pub fn new(config: JobConfig) -> Self {
        Self {
            config,
            phase: JobPhase::Idle,
            run: None,
            next_job_id: 1,
            dirty: false,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Id of the run currently owning the transport, if any.
    pub fn active_job_id(&self) -> Option<JobId> {
        self.run.as_ref().map(|run| run.job_id)
    }

    /// Byte offset of unprocessed data in the current run's buffer.
    /// Diagnostic accessor; `None` when no run exists.
    pub fn read_cursor(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.extractor.cursor())
    }

    pub fn view(&self) -> JobViewModel {
        let run = self.run.as_ref();
        let log: Vec<String> = run.map(|r| r.log.clone()).unwrap_or_default();
        JobViewModel {
            phase: self.phase,
            control_enabled: self.phase != JobPhase::Running,
            job_id: run.map(|r| r.job_id),
            latest_line: log.last().cloned(),
            log,
            result: run.and_then(|r| r.result),
            upload_percent: run.and_then(|r| r.upload_percent),
        }
    }

    /// Returns whether the view changed since the last call, and clears the
    /// flag. Used by the render loop to coalesce output.
    pub fn consume_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }

    /// Discards any finished run and starts a fresh one with a new id,
    /// buffer, cursor and marker.
    pub(crate) fn begin_run(&mut self) -> JobId {
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        self.run = Some(JobRun::new(job_id, self.config.framing.clone()));
        self.phase = JobPhase::Running;
        self.dirty = true;
        job_id
    }

    pub(crate) fn is_current(&self, job_id: JobId) -> bool {
        self.active_job_id() == Some(job_id)
    }

    /// Appends a chunk to the run's buffer, extracts and logs every complete
    /// unit, and scans each for the termination sentinels. Returns the result
    /// if one of the new units terminated the run.
    pub(crate) fn absorb_chunk(&mut self, text: &str) -> Option<JobResultKind> {
        let sentinels = self.config.sentinels.clone();
        let run = self.run.as_mut()?;
        run.buffer.push_str(text);
        let units = run.extractor.drain(&run.buffer);
        if units.is_empty() {
            return None;
        }
        run.stall_ticks = 0;
        self.dirty = true;
        let mut terminated = None;
        for unit in units {
            // All units in the chunk are logged; only the first sentinel hit
            // sets the marker.
            if run.marker == TerminationMarker::None {
                let marker = sentinels.scan(&unit);
                if marker.is_terminal() {
                    run.marker = marker;
                    let result = match marker {
                        TerminationMarker::Done => JobResultKind::Done,
                        _ => JobResultKind::ServerError,
                    };
                    run.result = Some(result);
                    terminated = Some(result);
                }
            }
            run.log.push(unit);
        }
        match terminated {
            Some(JobResultKind::Done) => self.phase = JobPhase::Completed,
            Some(_) => self.phase = JobPhase::Failed,
            None => {}
        }
        terminated
    }

    pub(crate) fn apply_upload_progress(&mut self, sent: u64, total: Option<u64>) {
        if let Some(run) = self.run.as_mut() {
            run.stall_ticks = 0;
            run.upload_percent = total
                .filter(|t| *t > 0)
                .map(|t| ((sent.min(t) * 100) / t) as u8);
            self.dirty = true;
        }
    }

    /// The transport finished on its own. Under `CompleteOnEnd` that is the
    /// success signal; under `FailIfUnterminated` an end without a sentinel
    /// is a transport failure.
    pub(crate) fn end_of_stream(&mut self) {
        let end_policy = self.config.end_policy;
        let Some(run) = self.run.as_mut() else {
            return;
        };
        match end_policy {
            EndPolicy::CompleteOnEnd => {
                run.marker = TerminationMarker::Done;
                run.result = Some(JobResultKind::Done);
                self.phase = JobPhase::Completed;
            }
            EndPolicy::FailIfUnterminated => {
                run.log.push(FAILURE_LOG_LINE.to_string());
                run.result = Some(JobResultKind::TransportError);
                self.phase = JobPhase::Failed;
            }
        }
        self.dirty = true;
    }

    pub(crate) fn fail_transport(&mut self, detail: &str) {
        if let Some(run) = self.run.as_mut() {
            run.log.push(FAILURE_LOG_LINE.to_string());
            run.log.push(detail.to_string());
            run.result = Some(JobResultKind::TransportError);
        }
        self.phase = JobPhase::Failed;
        self.dirty = true;
    }

    /// One poll tick elapsed without any transport event in between.
    /// Returns true when the stall policy says to give up.
    pub(crate) fn note_poll_tick(&mut self) -> bool {
        let StallPolicy::FailAfterTicks(limit) = self.config.stall_policy else {
            return false;
        };
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        run.stall_ticks = run.stall_ticks.saturating_add(1);
        if run.stall_ticks <= limit {
            return false;
        }
        run.log.push(STALL_LOG_LINE.to_string());
        run.result = Some(JobResultKind::Stalled);
        self.phase = JobPhase::Failed;
        self.dirty = true;
        true
    }
}
