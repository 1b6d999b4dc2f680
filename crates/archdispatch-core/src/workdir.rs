//! RAII guard for a temporary working directory change.
//!
//! Opening a library from its own folder lets co-located dependencies be
//! found. The previous directory is restored on drop, including on error
//! paths and unwinding.
//!
//! The working directory is process-global: while a guard is alive every
//! thread observes the changed directory.

use std::io;
use std::path::{Path, PathBuf};

/// Restores the previous working directory when dropped.
#[derive(Debug)]
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub(crate) struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    /// Switches to `dir`, remembering the current directory.
    pub(crate) fn enter(dir: &Path) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        tracing::debug!(dir = %dir.display(), "Entered library directory");
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                dir = %self.previous.display(),
                error = %err,
                "Failed to restore working directory"
            );
        }
    }
}
