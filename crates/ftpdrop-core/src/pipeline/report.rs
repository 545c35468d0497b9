//! Structured outcome of one run.

use crate::error::Error;

/// Where a run is (or where it stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Staging,
    Listing,
    Downloading,
    Disconnecting,
    Relocating,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Connecting => "connecting",
            Phase::Staging => "staging",
            Phase::Listing => "listing",
            Phase::Downloading => "downloading",
            Phase::Disconnecting => "disconnecting",
            Phase::Relocating => "relocating",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Downloaded { bytes: u64 },
    /// Larger than the threshold; never fetched.
    Skipped { size: u64 },
    /// Size could not be queried; never fetched.
    SizeUnknown,
    FetchFailed,
    /// Name would escape staging; no remote call made.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    pub name: String,
    pub status: EntryStatus,
}

/// Run-level failure tagged with the phase it ended the run in.
#[derive(Debug)]
pub struct RunFailure {
    pub phase: Phase,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-entry outcomes in listing order. Entries not reached (shutdown) are absent.
    pub entries: Vec<EntryOutcome>,
    pub failure: Option<RunFailure>,
    /// Shutdown was requested before every entry was processed.
    pub interrupted: bool,
    pub relocated: bool,
}

impl RunReport {
    /// Names staged during this run, in listing order.
    pub fn downloaded(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Downloaded { .. }))
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&EntryStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }

    pub fn status_of(&self, name: &str) -> Option<&EntryStatus> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.status)
    }

    /// No run-level failure and not interrupted. Per-entry failures do not count.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && !self.interrupted
    }

    /// Phase the run stopped in.
    pub fn final_phase(&self) -> Phase {
        self.failure.as_ref().map_or(Phase::Done, |f| f.phase)
    }
}
