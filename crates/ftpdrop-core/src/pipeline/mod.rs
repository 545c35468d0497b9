//! The transfer pipeline: one run from connect to relocation.
//!
//! connect → authenticate → ensure staging → CWD → NLST → per entry (size,
//! filter, fetch into staging) → disconnect → relocate staging onto the
//! destination. Run-level failures end the run with a `RunFailure` tagged by
//! phase; per-entry failures are recorded and the loop carries on. A session
//! call that fails with a run-level error mid-loop (connection lost) ends the
//! run in the downloading phase. An open session is always disconnected.

mod download;
mod report;

pub use report::{EntryOutcome, EntryStatus, Phase, RunFailure, RunReport};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::control::ShutdownSignal;
use crate::error::Error;
use crate::events::{EventKind, EventSink, TransferEvent};
use crate::filter;
use crate::relocate;
use crate::retry::RetryPolicy;
use crate::source::{RemoteSession, RemoteSource};
use crate::staging;

/// Login credentials. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    secret: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parameters of a run. Not mutated while a run executes.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub host: String,
    pub credentials: Credentials,
    pub remote_dir: String,
    pub staging_dir: PathBuf,
    pub destination_dir: PathBuf,
    /// Inclusive upper bound on entry size in bytes.
    pub size_threshold: u64,
}

/// What `Pipeline::probe` saw for one listed entry.
#[derive(Debug)]
pub struct ProbedEntry {
    pub name: String,
    pub size: Result<u64, Error>,
    pub qualifies: bool,
}

pub struct Pipeline {
    job: TransferJob,
    source: Arc<dyn RemoteSource>,
    events: Arc<dyn EventSink>,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(job: TransferJob, source: Arc<dyn RemoteSource>, events: Arc<dyn EventSink>) -> Self {
        Self {
            job,
            source,
            events,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn job(&self) -> &TransferJob {
        &self.job
    }

    fn emit(&self, kind: EventKind, entry: Option<&str>, message: impl Into<String>) {
        self.events.record(TransferEvent::new(kind, entry, message));
    }

    fn fail(&self, report: &mut RunReport, phase: Phase, error: Error) {
        self.emit(
            EventKind::RunFailed { phase },
            None,
            format!("run ended while {} ({} error): {}", phase, error.label(), error),
        );
        report.failure = Some(RunFailure { phase, error });
    }

    /// Execute one run. Never panics on remote or filesystem errors; they end up in the report.
    pub fn run(&self, shutdown: &ShutdownSignal) -> RunReport {
        let span = tracing::info_span!("run", host = %self.job.host);
        let _enter = span.enter();
        let started = Instant::now();
        let mut report = RunReport::default();

        let mut session = match self.open_session() {
            Ok(s) => s,
            Err(e) => {
                self.fail(&mut report, Phase::Connecting, e);
                return report;
            }
        };

        match self.prepare(session.as_mut()) {
            Ok(names) => self.download_all(session.as_mut(), &names, shutdown, &mut report),
            Err((phase, e)) => self.fail(&mut report, phase, e),
        }

        session.disconnect();
        self.emit(
            EventKind::Disconnected,
            None,
            format!("disconnected from {}", self.job.host),
        );

        if report.failure.is_none() && !report.interrupted {
            match relocate::relocate(&self.job.staging_dir, &self.job.destination_dir) {
                Ok(()) => {
                    report.relocated = true;
                    self.emit(
                        EventKind::Relocated {
                            destination: self.job.destination_dir.clone(),
                        },
                        None,
                        format!(
                            "moved {} to {}",
                            self.job.staging_dir.display(),
                            self.job.destination_dir.display()
                        ),
                    );
                }
                Err(e) => self.fail(&mut report, Phase::Relocating, e),
            }
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            downloaded = report.downloaded().len(),
            phase = %report.final_phase(),
            "run finished"
        );
        report
    }

    /// Connect and log in. A session that fails to log in is still disconnected.
    fn open_session(&self) -> Result<Box<dyn RemoteSession>, Error> {
        let mut session = self.source.connect(&self.job.host)?;
        let creds = &self.job.credentials;
        if let Err(e) = session.authenticate(creds.user(), creds.secret()) {
            session.disconnect();
            return Err(e);
        }
        self.emit(
            EventKind::Connected,
            None,
            format!("connected to {} as {}", self.job.host, creds.user()),
        );
        Ok(session)
    }

    /// Ensure staging, change to the remote directory and list it.
    fn prepare(&self, session: &mut dyn RemoteSession) -> Result<Vec<String>, (Phase, Error)> {
        let created = staging::ensure(&self.job.staging_dir).map_err(|e| (Phase::Staging, e))?;
        self.emit(
            EventKind::StagingReady { created },
            None,
            format!("staging directory {} ready", self.job.staging_dir.display()),
        );

        session
            .change_directory(&self.job.remote_dir)
            .map_err(|e| (Phase::Listing, e))?;
        let names = session.list().map_err(|e| (Phase::Listing, e))?;
        self.emit(
            EventKind::Listed {
                entries: names.len(),
            },
            None,
            format!("{} entries in {}", names.len(), self.job.remote_dir),
        );
        Ok(names)
    }

    /// Connect, list and query sizes without downloading or touching staging.
    pub fn probe(&self) -> Result<Vec<ProbedEntry>, Error> {
        let mut session = self.open_session()?;
        let listed = session
            .change_directory(&self.job.remote_dir)
            .and_then(|()| session.list());
        let names = match listed {
            Ok(names) => names,
            Err(e) => {
                session.disconnect();
                return Err(e);
            }
        };

        let entries = names
            .into_iter()
            .map(|name| {
                let size = if filter::check_entry_name(&name).is_ok() {
                    session.size(&name)
                } else {
                    Err(Error::SizeQuery {
                        entry: name.clone(),
                        reason: "unsafe entry name".to_string(),
                    })
                };
                let qualifies = matches!(size, Ok(s) if s <= self.job.size_threshold);
                ProbedEntry {
                    name,
                    size,
                    qualifies,
                }
            })
            .collect();
        session.disconnect();
        Ok(entries)
    }
}
