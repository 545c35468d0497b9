//! Per-entry admission: size threshold and entry-name safety.

/// A listed remote entry whose size was queried successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub size: u64,
}

/// True when the entry is small enough to download (`size <= threshold`).
pub fn qualifies(entry: &RemoteEntry, threshold: u64) -> bool {
    entry.size <= threshold
}

/// Why a listed name cannot be staged as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeName {
    Empty,
    DotEntry,
    Separator,
    Control,
}

impl std::fmt::Display for UnsafeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsafeName::Empty => write!(f, "empty name"),
            UnsafeName::DotEntry => write!(f, "`.` or `..` entry"),
            UnsafeName::Separator => write!(f, "name contains a path separator"),
            UnsafeName::Control => write!(f, "name contains NUL or control characters"),
        }
    }
}

/// Checks that `name` is a single path component that stays inside staging.
pub fn check_entry_name(name: &str) -> Result<(), UnsafeName> {
    if name.is_empty() {
        return Err(UnsafeName::Empty);
    }
    if name == "." || name == ".." {
        return Err(UnsafeName::DotEntry);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(UnsafeName::Separator);
    }
    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(UnsafeName::Control);
    }
    Ok(())
}
