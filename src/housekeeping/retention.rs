use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::watch::recording::list_recordings;

/// Cleans up recording sub-folders per spec.md §3's `history` semantics:
/// absent is handled by the caller (no cleanup call at all); `0` keeps only
/// the newest folder; `n>0` deletes folders older than `n` days.
pub fn enforce(recordings_dir: &Path, history_days: u32) {
    let recordings = list_recordings(recordings_dir);
    if recordings.is_empty() {
        return;
    }

    if history_days == 0 {
        for recording in recordings.into_iter().skip(1) {
            remove(&recording.folder);
        }
        return;
    }

    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(history_days) * 86_400);
    for recording in recordings.into_iter().skip(1) {
        if recording.created_at < cutoff {
            remove(&recording.folder);
        }
    }
}

fn remove(folder: &Path) {
    if let Err(error) = fs::remove_dir_all(folder) {
        tracing::warn!("history cleanup failed to remove {}: {error}", folder.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn make_folder(dir: &Path, name: &str) -> std::path::PathBuf {
        let folder = dir.join(name);
        fs::create_dir(&folder).expect("create folder");
        folder
    }

    #[test]
    fn history_zero_keeps_only_the_newest_folder() {
        let base = tempfile::tempdir().expect("tempdir");
        make_folder(base.path(), "rec-1");
        thread::sleep(Duration::from_millis(10));
        let newest = make_folder(base.path(), "rec-2");

        enforce(base.path(), 0);

        let remaining = list_recordings(base.path());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].folder, newest);
    }

    #[test]
    fn history_n_keeps_recent_folders() {
        let base = tempfile::tempdir().expect("tempdir");
        make_folder(base.path(), "rec-1");
        thread::sleep(Duration::from_millis(10));
        make_folder(base.path(), "rec-2");

        enforce(base.path(), 30);

        assert_eq!(list_recordings(base.path()).len(), 2);
    }
}
