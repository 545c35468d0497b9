//! Move the staging directory, as a unit, onto the destination path.
//!
//! Destination policy:
//! - missing: parents are created and the staging directory is renamed onto it
//! - existing empty directory: replaced
//! - existing non-empty directory, or not a directory: `Relocation` error
//!
//! When a rename crosses filesystems the tree is copied and the staging
//! directory removed afterwards; a failed copy removes the partial destination.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Error;

#[cfg(unix)]
const CROSS_DEVICE: i32 = libc::EXDEV;
#[cfg(windows)]
const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(any(unix, windows))]
    {
        e.raw_os_error() == Some(CROSS_DEVICE)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = e;
        false
    }
}

/// Relocate `staging` onto `destination`. On success `staging` no longer exists.
pub fn relocate(staging: &Path, destination: &Path) -> Result<(), Error> {
    let fail = |reason: String| Error::Relocation {
        from: staging.to_path_buf(),
        to: destination.to_path_buf(),
        reason,
    };

    if !staging.is_dir() {
        return Err(fail("staging directory does not exist".to_string()));
    }

    match fs::symlink_metadata(destination) {
        Ok(meta) if meta.is_dir() => {
            let mut entries =
                fs::read_dir(destination).map_err(|e| fail(format!("inspect destination: {e}")))?;
            if entries.next().is_some() {
                return Err(fail("destination exists and is not empty".to_string()));
            }
            fs::remove_dir(destination)
                .map_err(|e| fail(format!("replace empty destination: {e}")))?;
        }
        Ok(_) => return Err(fail("destination exists and is not a directory".to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = destination.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .map_err(|e| fail(format!("create destination parent: {e}")))?;
                }
            }
        }
        Err(e) => return Err(fail(format!("inspect destination: {e}"))),
    }

    match fs::rename(staging, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!("rename crosses filesystems, copying staged tree instead");
            copy_then_remove(staging, destination).map_err(|e| fail(format!("copy fallback: {e}")))
        }
        Err(e) => Err(fail(e.to_string())),
    }
}

/// Copy `from` to `to` recursively, then delete `from`. Removes `to` if the copy fails.
pub(crate) fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = copy_tree(from, to) {
        let _ = fs::remove_dir_all(to);
        return Err(e);
    }
    fs::remove_dir_all(from)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
