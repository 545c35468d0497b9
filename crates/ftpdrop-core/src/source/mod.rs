//! Remote file-listing/retrieval endpoint.
//!
//! `RemoteSource` opens one `RemoteSession` per run; the session holds the
//! connection for listing and every fetch, and is consumed by `disconnect`.
//! All calls block; the scheduler runs the pipeline on the blocking pool.

mod ftp;

pub use ftp::{FtpOptions, FtpSource};

use std::io::Write;

use crate::error::Error;

/// Factory for sessions against one kind of endpoint.
pub trait RemoteSource: Send + Sync {
    /// Open a session to `host`. Fails with `Error::Connection`.
    fn connect(&self, host: &str) -> Result<Box<dyn RemoteSession>, Error>;
}

/// One open connection. Not shared between runs.
pub trait RemoteSession: Send {
    /// Log in. Fails with `Error::Auth` (or `Error::Connection` if the dial itself fails).
    fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), Error>;

    /// Change to `path`. Fails with `Error::NotFound`.
    fn change_directory(&mut self, path: &str) -> Result<(), Error>;

    /// Entry names of the current directory, in server order. Fails with `Error::List`.
    fn list(&mut self) -> Result<Vec<String>, Error>;

    /// Size of one entry in bytes. Fails with `Error::SizeQuery`.
    fn size(&mut self, name: &str) -> Result<u64, Error>;

    /// Stream one entry into `sink`, returning the byte count. Fails with `Error::Transfer`.
    fn fetch(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, Error>;

    /// Close the connection. Best effort; never fails.
    fn disconnect(self: Box<Self>);
}
