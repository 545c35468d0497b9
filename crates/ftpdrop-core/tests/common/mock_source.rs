//! Scripted in-memory remote endpoint for pipeline and scheduler tests.
//!
//! Serves a fixed listing. Each entry can report a size that differs from its
//! body, refuse its size query, or fail fetches. Counters record connects,
//! disconnects, size queries and fetches, plus the peak number of sessions
//! open at once.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ftpdrop_core::control::ShutdownSignal;
use ftpdrop_core::retry::ErrorKind;
use ftpdrop_core::source::{RemoteSession, RemoteSource};
use ftpdrop_core::Error;

#[derive(Debug, Clone, Default)]
pub struct MockEntry {
    pub body: Vec<u8>,
    /// `None` makes the size query fail.
    pub size: Option<u64>,
    pub fail_fetch: bool,
    /// Number of leading fetch attempts that fail with a transient error.
    pub transient_failures: usize,
    /// The size query fails with a connection error, as if the server hung up.
    pub drops_connection: bool,
}

impl MockEntry {
    pub fn file(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            size: Some(body.len() as u64),
            body,
            ..Self::default()
        }
    }

    /// Reports `size` without holding that many bytes.
    pub fn sized(size: u64) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn unknown_size() -> Self {
        Self::default()
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn dropping_connection(mut self) -> Self {
        self.drops_connection = true;
        self
    }

    pub fn transient(mut self, failures: usize) -> Self {
        self.transient_failures = failures;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Connect,
    Auth,
    ChangeDirectory,
    List,
}

#[derive(Default)]
struct Script {
    listing: Vec<(String, MockEntry)>,
    fail_at: Option<FailAt>,
    list_delay: Duration,
    fetch_delay: Duration,
    shutdown_after_fetch: Option<ShutdownSignal>,
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    fetch_started: AtomicUsize,
    fetch_attempts: Mutex<HashMap<String, usize>>,
    size_queries: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct MockSource {
    shared: Arc<Shared>,
}

impl MockSource {
    pub fn new(listing: Vec<(&str, MockEntry)>) -> Self {
        let source = Self::default();
        source.script().listing = listing
            .into_iter()
            .map(|(name, entry)| (name.to_string(), entry))
            .collect();
        source
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.shared.script.lock().unwrap()
    }

    pub fn fail_at(&self, step: FailAt) -> &Self {
        self.script().fail_at = Some(step);
        self
    }

    pub fn list_delay(&self, delay: Duration) -> &Self {
        self.script().list_delay = delay;
        self
    }

    pub fn fetch_delay(&self, delay: Duration) -> &Self {
        self.script().fetch_delay = delay;
        self
    }

    /// Request `signal` as soon as any fetch completes.
    pub fn shutdown_after_fetch(&self, signal: ShutdownSignal) -> &Self {
        self.script().shutdown_after_fetch = Some(signal);
        self
    }

    /// Replace one entry's body (and reported size).
    pub fn set_body(&self, name: &str, body: &[u8]) {
        let mut script = self.script();
        if let Some((_, entry)) = script.listing.iter_mut().find(|(n, _)| n == name) {
            entry.body = body.to_vec();
            entry.size = Some(body.len() as u64);
        }
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.shared.disconnects.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    /// Fetches begun, counting retries.
    pub fn fetches_started(&self) -> usize {
        self.shared.fetch_started.load(Ordering::SeqCst)
    }

    pub fn fetch_attempts(&self, name: &str) -> usize {
        self.shared
            .fetch_attempts
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn size_queries(&self) -> Vec<String> {
        self.shared.size_queries.lock().unwrap().clone()
    }
}

impl RemoteSource for MockSource {
    fn connect(&self, host: &str) -> Result<Box<dyn RemoteSession>, Error> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.script().fail_at == Some(FailAt::Connect) {
            return Err(Error::Connection {
                host: host.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let now = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            source: self.clone(),
            cwd: None,
        }))
    }
}

struct MockSession {
    source: MockSource,
    cwd: Option<String>,
}

impl MockSession {
    fn entry(&self, name: &str) -> Option<MockEntry> {
        self.source
            .script()
            .listing
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.clone())
    }

    fn fails_at(&self, step: FailAt) -> bool {
        self.source.script().fail_at == Some(step)
    }
}

impl RemoteSession for MockSession {
    fn authenticate(&mut self, user: &str, _secret: &str) -> Result<(), Error> {
        if self.fails_at(FailAt::Auth) {
            return Err(Error::Auth {
                user: user.to_string(),
                reason: "530 Login incorrect".to_string(),
            });
        }
        Ok(())
    }

    fn change_directory(&mut self, path: &str) -> Result<(), Error> {
        if self.fails_at(FailAt::ChangeDirectory) {
            return Err(Error::NotFound {
                path: path.to_string(),
                reason: "550 No such directory".to_string(),
            });
        }
        self.cwd = Some(path.to_string());
        Ok(())
    }

    fn list(&mut self) -> Result<Vec<String>, Error> {
        let delay = self.source.script().list_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fails_at(FailAt::List) {
            return Err(Error::List("425 Can't open data connection".to_string()));
        }
        assert!(self.cwd.is_some(), "list before change_directory");
        Ok(self
            .source
            .script()
            .listing
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn size(&mut self, name: &str) -> Result<u64, Error> {
        self.source
            .shared
            .size_queries
            .lock()
            .unwrap()
            .push(name.to_string());
        let entry = self.entry(name);
        if entry.as_ref().map_or(false, |e| e.drops_connection) {
            return Err(Error::Connection {
                host: "mock.example.net".to_string(),
                reason: "421 Service not available, closing control connection".to_string(),
            });
        }
        entry
            .and_then(|e| e.size)
            .ok_or_else(|| Error::SizeQuery {
                entry: name.to_string(),
                reason: "550 SIZE not allowed".to_string(),
            })
    }

    fn fetch(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, Error> {
        self.source.shared.fetch_started.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.source.shared.fetch_attempts.lock().unwrap();
            let n = attempts.entry(name.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        let delay = self.source.script().fetch_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let entry = self.entry(name).ok_or_else(|| Error::Transfer {
            entry: name.to_string(),
            kind: ErrorKind::Other,
            reason: "550 not found".to_string(),
        })?;
        let result = if entry.fail_fetch {
            Err(Error::Transfer {
                entry: name.to_string(),
                kind: ErrorKind::Other,
                reason: "550 Permission denied".to_string(),
            })
        } else if attempt <= entry.transient_failures {
            sink.write_all(&entry.body[..entry.body.len() / 2]).unwrap();
            Err(Error::Transfer {
                entry: name.to_string(),
                kind: ErrorKind::Connection,
                reason: "426 Connection closed; transfer aborted".to_string(),
            })
        } else {
            sink.write_all(&entry.body).unwrap();
            Ok(entry.body.len() as u64)
        };

        if let Some(signal) = &self.source.script().shutdown_after_fetch {
            signal.request();
        }
        result
    }

    fn disconnect(self: Box<Self>) {
        self.source.shared.disconnects.fetch_add(1, Ordering::SeqCst);
        self.source.shared.active.fetch_sub(1, Ordering::SeqCst);
    }
}
