//! Jobstream core: pure job-progress state machine and view-model helpers.
mod effect;
mod extract;
mod msg;
mod sentinel;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use extract::{FragmentExtractor, Framing};
pub use msg::Msg;
pub use sentinel::{SentinelSet, TerminationMarker};
pub use state::{
    EndPolicy, JobConfig, JobId, JobPhase, JobResultKind, JobState, StallPolicy, FAILURE_LOG_LINE,
};
pub use update::update;
pub use view_model::JobViewModel;
