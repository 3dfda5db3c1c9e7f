/// Outcome marker derived from scanning message units for sentinel text.
/// Once `Done` or `Error` is set it is terminal for the job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationMarker {
    #[default]
    None,
    Done,
    Error,
}

impl TerminationMarker {
    pub fn is_terminal(self) -> bool {
        self != TerminationMarker::None
    }
}

/// Caller-supplied sentinel substrings signalling job completion or failure.
///
/// Matching is a case-insensitive substring search anywhere in the unit's raw
/// text, not structured parsing, so tagged-text and JSON protocols share the
/// same detection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelSet {
    done: String,
    error: String,
}

impl SentinelSet {
    pub fn new(done: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            done: done.into().to_lowercase(),
            error: error.into().to_lowercase(),
        }
    }

    /// Scans one unit; the done sentinel is checked first. Empty sentinels
    /// never match.
    pub fn scan(&self, unit: &str) -> TerminationMarker {
        let lowered = unit.to_lowercase();
        if !self.done.is_empty() && lowered.contains(&self.done) {
            TerminationMarker::Done
        } else if !self.error.is_empty() && lowered.contains(&self.error) {
            TerminationMarker::Error
        } else {
            TerminationMarker::None
        }
    }
}
