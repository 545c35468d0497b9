//! FTP source on libcurl.
//!
//! One `curl::easy::Easy` handle per session. curl keeps the control
//! connection cached inside the handle, so login, CWD, NLST, SIZE and every
//! RETR of a run share one connection. Dropping the handle sends QUIT.

use std::io::Write;
use std::time::Duration;

use curl::easy::Easy;
use url::Url;

use super::{RemoteSession, RemoteSource};
use crate::config::FtpdropConfig;
use crate::error::Error;
use crate::retry::{classify_curl_error, ErrorKind};

/// Timeouts applied to every request of a session.
#[derive(Debug, Clone, Copy)]
pub struct FtpOptions {
    pub connect_timeout: Duration,
    /// Abort a transfer slower than `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for FtpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
        }
    }
}

impl From<&FtpdropConfig> for FtpOptions {
    fn from(cfg: &FtpdropConfig) -> Self {
        let mut opts = FtpOptions::default();
        if let Some(secs) = cfg.connect_timeout_secs {
            opts.connect_timeout = Duration::from_secs(secs.max(1));
        }
        opts
    }
}

#[derive(Debug, Clone, Default)]
pub struct FtpSource {
    opts: FtpOptions,
}

impl FtpSource {
    pub fn new(opts: FtpOptions) -> Self {
        Self { opts }
    }
}

impl RemoteSource for FtpSource {
    fn connect(&self, host: &str) -> Result<Box<dyn RemoteSession>, Error> {
        let conn_err = |reason: String| Error::Connection {
            host: host.to_string(),
            reason,
        };
        let base = base_url(host).map_err(conn_err)?;

        let mut easy = Easy::new();
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(|e| conn_err(e.to_string()))?;
        easy.low_speed_limit(self.opts.low_speed_limit)
            .map_err(|e| conn_err(e.to_string()))?;
        easy.low_speed_time(self.opts.low_speed_time)
            .map_err(|e| conn_err(e.to_string()))?;

        tracing::debug!(url = %base, "FTP session opened");
        Ok(Box::new(FtpSession {
            easy,
            host: host.to_string(),
            user: String::new(),
            dir: base.clone(),
            dir_path: "/".to_string(),
            base,
        }))
    }
}

struct FtpSession {
    easy: Easy,
    host: String,
    user: String,
    base: Url,
    dir: Url,
    dir_path: String,
}

impl FtpSession {
    /// Body-less request: login, CWD and (for a file URL) SIZE, nothing transferred.
    fn probe(&mut self, url: &Url) -> Result<(), curl::Error> {
        self.easy.url(url.as_str())?;
        self.easy.nobody(true)?;
        let mut transfer = self.easy.transfer();
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()
    }

    fn connection_error(&self, e: &curl::Error) -> Error {
        Error::Connection {
            host: self.host.clone(),
            reason: e.to_string(),
        }
    }

    fn is_connection_level(e: &curl::Error) -> bool {
        matches!(
            classify_curl_error(e),
            ErrorKind::Timeout | ErrorKind::Connection
        )
    }
}

impl RemoteSession for FtpSession {
    fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), Error> {
        self.user = user.to_string();
        let setup = self
            .easy
            .username(user)
            .and_then(|()| self.easy.password(secret));
        if let Err(e) = setup {
            return Err(Error::Auth {
                user: user.to_string(),
                reason: e.to_string(),
            });
        }
        let base = self.base.clone();
        self.probe(&base).map_err(|e| {
            if e.is_login_denied() {
                Error::Auth {
                    user: user.to_string(),
                    reason: e.to_string(),
                }
            } else {
                self.connection_error(&e)
            }
        })
    }

    fn change_directory(&mut self, path: &str) -> Result<(), Error> {
        let url = dir_url(&self.base, path).map_err(|reason| Error::NotFound {
            path: path.to_string(),
            reason,
        })?;
        match self.probe(&url) {
            Ok(()) => {
                self.dir = url;
                self.dir_path = path.to_string();
                Ok(())
            }
            Err(e) if Self::is_connection_level(&e) => Err(self.connection_error(&e)),
            Err(e) => Err(Error::NotFound {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn list(&mut self) -> Result<Vec<String>, Error> {
        let mut body = Vec::new();
        let url = self.dir.clone();
        let res = (|| -> Result<(), curl::Error> {
            self.easy.url(url.as_str())?;
            self.easy.nobody(false)?;
            // Names only; LIST output is server-specific. curl applies this to
            // directory URLs alone, so later SIZE and RETR requests are unaffected.
            self.easy.custom_request("NLST")?;
            let mut transfer = self.easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()
        })();
        res.map_err(|e| Error::List(format!("NLST {}: {}", self.dir_path, e)))?;
        Ok(parse_name_list(&body))
    }

    fn size(&mut self, name: &str) -> Result<u64, Error> {
        let size_err = |reason: String| Error::SizeQuery {
            entry: name.to_string(),
            reason,
        };
        let url = entry_url(&self.dir, name).map_err(size_err)?;
        self.probe(&url).map_err(|e| size_err(e.to_string()))?;
        let len = self
            .easy
            .content_length_download()
            .map_err(|e| size_err(e.to_string()))?;
        if len < 0.0 {
            return Err(size_err("server did not report a size".to_string()));
        }
        Ok(len as u64)
    }

    fn fetch(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, Error> {
        let url = entry_url(&self.dir, name).map_err(|reason| Error::Transfer {
            entry: name.to_string(),
            kind: ErrorKind::Other,
            reason,
        })?;

        let mut written = 0u64;
        let mut write_err: Option<std::io::Error> = None;
        let res = (|| -> Result<(), curl::Error> {
            self.easy.url(url.as_str())?;
            self.easy.nobody(false)?;
            let mut transfer = self.easy.transfer();
            transfer.write_function(|data| match sink.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        })();

        if let Some(e) = write_err {
            return Err(Error::Transfer {
                entry: name.to_string(),
                kind: ErrorKind::Other,
                reason: format!("write to staging: {}", e),
            });
        }
        res.map_err(|e| Error::Transfer {
            entry: name.to_string(),
            kind: classify_curl_error(&e),
            reason: e.to_string(),
        })?;
        Ok(written)
    }

    fn disconnect(self: Box<Self>) {
        tracing::debug!(host = %self.host, user = %self.user, "closing FTP session");
        drop(self);
    }
}

/// `ftp://host[:port]/` for a configured host (a leading `ftp://` is tolerated).
pub(crate) fn base_url(host: &str) -> Result<Url, String> {
    let host = host.trim();
    let host = host.strip_prefix("ftp://").unwrap_or(host).trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(format!("invalid host `{}`", host));
    }
    let url = Url::parse(&format!("ftp://{}/", host)).map_err(|e| e.to_string())?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("invalid host `{}`", host));
    }
    Ok(url)
}

/// Directory URL with a trailing slash. An absolute path starts with a `%2F`
/// segment so curl issues `CWD /` before descending.
pub(crate) fn dir_url(base: &Url, path: &str) -> Result<Url, String> {
    let mut url = base.clone();
    {
        let mut segs = url
            .path_segments_mut()
            .map_err(|()| format!("cannot build a path under {}", base))?;
        segs.clear();
        if path.starts_with('/') {
            segs.push("/");
        }
        for part in path.split('/').filter(|p| !p.is_empty()) {
            segs.push(part);
        }
        segs.push("");
    }
    Ok(url)
}

/// URL of one entry inside a directory URL.
pub(crate) fn entry_url(dir: &Url, name: &str) -> Result<Url, String> {
    let mut url = dir.clone();
    url.path_segments_mut()
        .map_err(|()| format!("cannot build a path under {}", dir))?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

/// Split an NLST body into entry names, keeping server order. Names are kept
/// verbatim (a `sub/c.txt` line stays as is and is rejected later), except
/// that `.` and `..` are dropped.
pub(crate) fn parse_name_list(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty() && *line != "." && *line != "..")
        .map(str::to_string)
        .collect()
}
