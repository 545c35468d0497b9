//! Event sink: what happened during a run, one record per step or entry.
//!
//! The pipeline never logs directly; it emits `TransferEvent`s into an
//! `EventSink`. `TracingSink` turns them into log lines (the fmt layer adds
//! timestamp and level); `MemorySink` keeps them for inspection.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use crate::pipeline::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// What an event is about. Entry-level kinds come with `TransferEvent::entry` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    StagingReady { created: bool },
    Listed { entries: usize },
    Downloading { size: u64 },
    Downloaded { bytes: u64 },
    Skipped { size: u64, threshold: u64 },
    SizeQueryFailed,
    FetchFailed,
    EntryRejected,
    Disconnected,
    Relocated { destination: PathBuf },
    Interrupted { remaining: usize },
    RunFailed { phase: Phase },
}

impl EventKind {
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::SizeQueryFailed
            | EventKind::FetchFailed
            | EventKind::EntryRejected
            | EventKind::RunFailed { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub at: SystemTime,
    pub kind: EventKind,
    /// Remote entry name for file-level events.
    pub entry: Option<String>,
    pub message: String,
}

impl TransferEvent {
    pub fn new(kind: EventKind, entry: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            at: SystemTime::now(),
            kind,
            entry: entry.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Records events. Implementations must tolerate calls from the blocking run task.
pub trait EventSink: Send + Sync {
    fn record(&self, event: TransferEvent);
}

/// Writes each event as one tracing line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: TransferEvent) {
        match (event.severity(), event.entry.as_deref()) {
            (Severity::Info, Some(entry)) => tracing::info!(entry, "{}", event.message),
            (Severity::Info, None) => tracing::info!("{}", event.message),
            (Severity::Error, Some(entry)) => tracing::error!(entry, "{}", event.message),
            (Severity::Error, None) => tracing::error!("{}", event.message),
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TransferEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events recorded for one entry, in order.
    pub fn for_entry(&self, name: &str) -> Vec<TransferEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.entry.as_deref() == Some(name))
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: TransferEvent) {
        if let Ok(mut e) = self.events.lock() {
            e.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        assert_eq!(EventKind::FetchFailed.severity(), Severity::Error);
        assert_eq!(
            EventKind::Skipped {
                size: 10,
                threshold: 5
            }
            .severity(),
            Severity::Info
        );
        assert_eq!(
            EventKind::RunFailed {
                phase: Phase::Listing
            }
            .severity(),
            Severity::Error
        );
    }

    #[test]
    fn memory_sink_filters_by_entry() {
        let sink = MemorySink::new();
        sink.record(TransferEvent::new(EventKind::Connected, None, "connected"));
        sink.record(TransferEvent::new(
            EventKind::Downloading { size: 3 },
            Some("a.txt"),
            "downloading",
        ));
        sink.record(TransferEvent::new(
            EventKind::SizeQueryFailed,
            Some("b.txt"),
            "no size",
        ));
        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.for_entry("a.txt").len(), 1);
        assert_eq!(sink.for_entry("b.txt")[0].severity(), Severity::Error);
    }
}
