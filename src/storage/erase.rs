use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::warn;

/// A file or directory the store failed to remove.
#[derive(Debug)]
pub struct EraseFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

///
/// The outcome of a best-effort erase.
///
/// Erasing never fails as a whole. Every entry that could not be removed is
/// logged and recorded here, and the erase moves on to the next entry. A failed
/// file removal therefore usually leaves its directory behind as well.
///
#[derive(Debug, Default)]
pub struct EraseReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<EraseFailure>,
}

impl EraseReport {
    /// Returns `true` if nothing failed to be removed.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_removed(&mut self, path: &Path) {
        self.removed.push(path.to_path_buf());
    }

    pub(crate) fn record_failure(&mut self, path: &Path, error: io::Error) {
        warn!("Failed to erase {}: {}", path.display(), error);
        self.failures.push(EraseFailure {
            path: path.to_path_buf(),
            error,
        });
    }

    pub(crate) fn extend(&mut self, other: EraseReport) {
        self.removed.extend(other.removed);
        self.failures.extend(other.failures);
    }
}
