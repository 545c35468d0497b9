//! Per-entry download loop with failure isolation.

use super::{EntryOutcome, EntryStatus, Phase, Pipeline, RunReport};
use crate::control::ShutdownSignal;
use crate::error::Error;
use crate::events::EventKind;
use crate::filter::{self, RemoteEntry};
use crate::retry::{run_with_retry, ErrorKind};
use crate::source::RemoteSession;
use crate::staging::StagedFile;

impl Pipeline {
    /// Process every listed entry in order. Stops early on shutdown, or when a
    /// session call fails in a way that is not specific to the entry (the
    /// connection is gone), which ends the run.
    pub(super) fn download_all(
        &self,
        session: &mut dyn RemoteSession,
        names: &[String],
        shutdown: &ShutdownSignal,
        report: &mut RunReport,
    ) {
        for (i, name) in names.iter().enumerate() {
            if shutdown.is_requested() {
                let remaining = names.len() - i;
                report.interrupted = true;
                self.emit(
                    EventKind::Interrupted { remaining },
                    None,
                    format!("shutdown requested; {} entries left unprocessed", remaining),
                );
                break;
            }
            match self.process_entry(session, name, shutdown) {
                Ok(status) => report.entries.push(EntryOutcome {
                    name: name.clone(),
                    status,
                }),
                Err(e) => {
                    self.fail(report, Phase::Downloading, e);
                    break;
                }
            }
        }
    }

    /// Outcome of one entry. `Err` only for run-level errors.
    fn process_entry(
        &self,
        session: &mut dyn RemoteSession,
        name: &str,
        shutdown: &ShutdownSignal,
    ) -> Result<EntryStatus, Error> {
        if let Err(why) = filter::check_entry_name(name) {
            self.emit(
                EventKind::EntryRejected,
                Some(name),
                format!("rejected entry {:?}: {}", name, why),
            );
            return Ok(EntryStatus::Rejected);
        }

        let size = match session.size(name) {
            Ok(size) => size,
            Err(e) if e.is_per_entry() => {
                self.emit(EventKind::SizeQueryFailed, Some(name), e.to_string());
                return Ok(EntryStatus::SizeUnknown);
            }
            Err(e) => return Err(e),
        };

        let threshold = self.job.size_threshold;
        let entry = RemoteEntry {
            name: name.to_string(),
            size,
        };
        if !filter::qualifies(&entry, threshold) {
            self.emit(
                EventKind::Skipped { size, threshold },
                Some(name),
                format!("skipped {}: {} bytes exceeds {} bytes", name, size, threshold),
            );
            return Ok(EntryStatus::Skipped { size });
        }

        self.emit(
            EventKind::Downloading { size },
            Some(name),
            format!("downloading {} ({} bytes)", name, size),
        );
        match self.fetch_into_staging(session, name, shutdown) {
            Ok(bytes) => {
                self.emit(
                    EventKind::Downloaded { bytes },
                    Some(name),
                    format!("staged {} ({} bytes)", name, bytes),
                );
                Ok(EntryStatus::Downloaded { bytes })
            }
            Err(e) if e.is_per_entry() => {
                self.emit(EventKind::FetchFailed, Some(name), e.to_string());
                Ok(EntryStatus::FetchFailed)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch into a temp file in staging, then rename onto `<name>`. Each retry starts over.
    fn fetch_into_staging(
        &self,
        session: &mut dyn RemoteSession,
        name: &str,
        shutdown: &ShutdownSignal,
    ) -> Result<u64, Error> {
        let staging_dir = &self.job.staging_dir;
        let local_err = |what: &str, e: std::io::Error| Error::Transfer {
            entry: name.to_string(),
            kind: ErrorKind::Other,
            reason: format!("{}: {}", what, e),
        };
        run_with_retry(&self.retry, shutdown, |attempt| {
            if attempt > 1 {
                tracing::debug!(entry = name, attempt, "fetch attempt");
            }
            let mut staged =
                StagedFile::create(staging_dir, name).map_err(|e| local_err("create temp file", e))?;
            let bytes = session.fetch(name, &mut staged)?;
            staged
                .finalize()
                .map_err(|e| local_err("finalize staged file", e))?;
            Ok(bytes)
        })
    }
}
