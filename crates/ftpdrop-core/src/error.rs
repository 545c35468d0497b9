//! Error taxonomy for one pipeline run.
//!
//! Run-level errors (connect, login, remote directory, listing, staging,
//! relocation) end the current run. Per-entry errors (size query, fetch) are
//! recorded and the download loop moves on to the next entry.

use std::io;
use std::path::PathBuf;

use crate::retry::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote endpoint could not be reached (resolve, dial, timeout).
    #[error("could not connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    /// The endpoint rejected the credentials.
    #[error("login rejected for user {user}: {reason}")]
    Auth { user: String, reason: String },

    /// The configured remote directory does not exist or is not accessible.
    #[error("remote directory {path} not found: {reason}")]
    NotFound { path: String, reason: String },

    /// The directory listing could not be obtained.
    #[error("listing failed: {0}")]
    List(String),

    /// Size of one entry could not be determined (directory, unsupported, gone).
    #[error("size query failed for {entry}: {reason}")]
    SizeQuery { entry: String, reason: String },

    /// Fetching one entry failed. `kind` drives the retry decision.
    #[error("transfer of {entry} failed: {reason}")]
    Transfer {
        entry: String,
        kind: ErrorKind,
        reason: String,
    },

    /// The staging directory could not be prepared.
    #[error("staging directory {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The staged batch could not be moved to its destination.
    #[error("relocating {} to {} failed: {reason}", from.display(), to.display())]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

impl Error {
    /// True for errors that only affect a single entry; the run carries on.
    pub fn is_per_entry(&self) -> bool {
        matches!(self, Error::SizeQuery { .. } | Error::Transfer { .. })
    }

    /// Short, stable label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "connection",
            Error::Auth { .. } => "auth",
            Error::NotFound { .. } => "not_found",
            Error::List(_) => "list",
            Error::SizeQuery { .. } => "size_query",
            Error::Transfer { .. } => "transfer",
            Error::Filesystem { .. } => "filesystem",
            Error::Relocation { .. } => "relocation",
        }
    }
}
