use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

/// A sub-directory under `<watch>/recordings`, identified by its on-disk
/// creation time (spec.md §3).
#[derive(Debug, Clone)]
pub struct Recording {
    pub folder: PathBuf,
    pub created_at: SystemTime,
}

impl Recording {
    pub fn meta_path(&self) -> PathBuf {
        self.folder.join("meta.json")
    }
}

/// Lists recording sub-folders under `recordings_dir`, newest first.
pub fn list_recordings(recordings_dir: &Path) -> Vec<Recording> {
    let Ok(entries) = fs::read_dir(recordings_dir) else {
        return Vec::new();
    };

    let mut recordings: Vec<Recording> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let created_at = entry.metadata().ok()?.created().ok()?;
            Some(Recording {
                folder: entry.path(),
                created_at,
            })
        })
        .collect();

    recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recordings
}

pub fn newest_recording(recordings_dir: &Path) -> Option<Recording> {
    list_recordings(recordings_dir).into_iter().next()
}

/// A recording is valid once `meta.json` parses and `duration` is present
/// and numerically greater than zero (spec.md §3). Partial writes (`{}`)
/// are rejected, not errors — the caller retries on the next write event.
pub fn is_valid_meta(meta: &Value) -> bool {
    meta.get("duration")
        .and_then(Value::as_f64)
        .is_some_and(|duration| duration > 0.0)
}

pub fn read_meta(meta_path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(meta_path).ok()?;
    serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_meta_requires_positive_duration() {
        assert!(is_valid_meta(&json!({"duration": 2.3})));
        assert!(!is_valid_meta(&json!({"duration": 0})));
        assert!(!is_valid_meta(&json!({})));
    }

    #[test]
    fn newest_recording_picks_most_recently_created_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("a");
        let second = dir.path().join("b");
        std::fs::create_dir(&first).expect("create a");
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::create_dir(&second).expect("create b");

        let newest = newest_recording(dir.path()).expect("a newest folder");
        assert_eq!(newest.folder, second);
    }
}
