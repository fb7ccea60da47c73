use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

use crate::bootstrap::recordings_dir;
use crate::error::AppResult;
use crate::watch::primitive::{FsWatcher, WatchSignal};

/// Watches the parent of `<watch>/recordings`. Creates the parent directory
/// if missing at start; hands control to the Recording Pipeline once the
/// `recordings` sub-directory appears (spec.md §4.C).
pub struct ParentWatcher {
    watcher: FsWatcher,
    watch_root: PathBuf,
}

impl ParentWatcher {
    pub fn start(watch_root: PathBuf, signal_tx: Sender<WatchSignal>) -> AppResult<Self> {
        if !watch_root.exists() {
            fs::create_dir_all(&watch_root)?;
        }

        let watcher = FsWatcher::watch(watch_root.clone(), signal_tx)?;
        Ok(Self { watcher, watch_root })
    }

    pub fn recordings_dir_appeared(&self) -> bool {
        recordings_dir(&self.watch_root).is_dir()
    }

    pub fn stop(self) {
        self.watcher.stop();
    }
}

pub fn recordings_subdir_exists(watch_root: &Path) -> bool {
    recordings_dir(watch_root).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_creates_missing_watch_root() {
        let base = tempfile::tempdir().expect("tempdir");
        let watch_root = base.path().join("superwhisper");
        let (tx, _rx) = crossbeam_channel::unbounded();

        let watcher = ParentWatcher::start(watch_root.clone(), tx).expect("start");
        assert!(watch_root.is_dir());
        assert!(!watcher.recordings_dir_appeared());
        watcher.stop();
    }

    #[test]
    fn detects_recordings_subdir_once_created() {
        let base = tempfile::tempdir().expect("tempdir");
        let watch_root = base.path().join("superwhisper");
        let (tx, _rx) = crossbeam_channel::unbounded();
        let watcher = ParentWatcher::start(watch_root.clone(), tx).expect("start");

        fs::create_dir_all(watch_root.join("recordings")).expect("create recordings dir");
        assert!(watcher.recordings_dir_appeared());
        watcher.stop();
    }
}
