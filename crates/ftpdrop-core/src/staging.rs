//! Local staging directory and staged file lifecycle.
//!
//! Entries are written to a uniquely named hidden temp file inside staging and
//! atomically renamed to `<name>` once complete, replacing an earlier copy of
//! the same entry. The temp name is created exclusively, so it never collides
//! with an entry already staged, whatever that entry is called.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::Error;

/// Prefix and suffix of in-progress files.
const TEMP_PREFIX: &str = ".ftpdrop-";
const TEMP_SUFFIX: &str = ".part";

/// Make sure `path` is a directory, creating it (and parents) if absent.
///
/// Returns `Ok(true)` when the directory was created, `Ok(false)` when it already
/// existed. A non-directory at `path` is a `Filesystem` error.
pub fn ensure(path: &Path) -> Result<bool, Error> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => Err(Error::Filesystem {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|source| Error::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "created staging directory");
            Ok(true)
        }
        Err(source) => Err(Error::Filesystem {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A staged entry being written. Dropping it without `finalize` removes the temp file.
pub struct StagedFile {
    file: NamedTempFile,
    final_path: PathBuf,
}

impl StagedFile {
    /// Create a fresh temp file in `dir` that will become `<dir>/<name>`.
    pub fn create(dir: &Path, name: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        Ok(StagedFile {
            file,
            final_path: dir.join(name),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Sync and rename onto the final name, replacing an existing file.
    /// On failure the temp file is removed.
    pub fn finalize(self) -> io::Result<PathBuf> {
        self.file.as_file().sync_all()?;
        self.file
            .persist(&self.final_path)
            .map_err(|e| e.error)?;
        Ok(self.final_path)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_is_hidden_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedFile::create(dir.path(), "report.csv").unwrap();
        let b = StagedFile::create(dir.path(), "report.csv").unwrap();
        let name = a.temp_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_PREFIX));
        assert!(name.ends_with(TEMP_SUFFIX));
        assert_ne!(a.temp_path(), b.temp_path());
    }

    #[test]
    fn entry_named_like_a_part_file_survives_later_entries() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = StagedFile::create(dir.path(), "report.csv.part").unwrap();
        first.write_all(b"PART-ENTRY").unwrap();
        first.finalize().unwrap();

        let mut second = StagedFile::create(dir.path(), "report.csv").unwrap();
        second.write_all(b"MAIN").unwrap();
        second.finalize().unwrap();

        assert_eq!(fs::read(dir.path().join("report.csv.part")).unwrap(), b"PART-ENTRY");
        assert_eq!(fs::read(dir.path().join("report.csv")).unwrap(), b"MAIN");
    }

    #[test]
    fn ensure_creates_nested_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("a").join("b").join("staging");
        assert!(ensure(&staging).unwrap());
        assert!(staging.is_dir());
        assert!(!ensure(&staging).unwrap());
    }

    #[test]
    fn ensure_rejects_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        fs::write(&path, b"not a dir").unwrap();
        let err = ensure(&path).unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn finalize_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"old contents").unwrap();

        let mut staged = StagedFile::create(dir.path(), "a.txt").unwrap();
        staged.write_all(b"new").unwrap();
        let tp = staged.temp_path().to_path_buf();
        let final_path = staged.finalize().unwrap();

        assert!(!tp.exists());
        assert_eq!(fs::read(&final_path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn drop_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = {
            let mut staged = StagedFile::create(dir.path(), "y.bin").unwrap();
            staged.write_all(b"partial").unwrap();
            staged.temp_path().to_path_buf()
        };
        assert!(!tp.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
