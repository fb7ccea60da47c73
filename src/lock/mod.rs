use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{AppError, AppResult};

/// Exclusive, non-blocking advisory lock held for the process lifetime.
/// Grounded in the same `try_lock_exclusive`/`WouldBlock` branch used for
/// single-instance enforcement elsewhere in the pack (spec.md §4.I).
pub struct SingleInstanceLock {
    file: File,
    path: PathBuf,
}

impl SingleInstanceLock {
    /// Returns `Ok(Some(lock))` when this process becomes the daemon,
    /// `Ok(None)` when another instance already holds the lock (the caller
    /// should become a CLI client instead).
    pub fn try_acquire(path: &Path) -> AppResult<Option<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path: path.to_owned() })),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(AppError::LockUnavailable(format!(
                "failed to lock {}: {error}",
                path.display()
            ))),
        }
    }
}

impl Drop for SingleInstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_attempt_observes_the_lock_as_held() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("macrowhisper.lock");

        let first = SingleInstanceLock::try_acquire(&path)
            .expect("first acquire")
            .expect("first instance becomes daemon");

        let second = SingleInstanceLock::try_acquire(&path).expect("second acquire");
        assert!(second.is_none());

        drop(first);
    }

    #[test]
    fn lock_is_released_after_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("macrowhisper.lock");

        let first = SingleInstanceLock::try_acquire(&path)
            .expect("first acquire")
            .expect("first instance");
        drop(first);

        let second = SingleInstanceLock::try_acquire(&path).expect("second acquire");
        assert!(second.is_some());
    }
}
