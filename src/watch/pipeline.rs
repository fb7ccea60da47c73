use std::collections::HashSet;
use std::path::PathBuf;

use serde_json::Value;

use crate::watch::recording::{is_valid_meta, newest_recording, read_meta, Recording};

/// Tracks the newest recording sub-folder, watches for its `meta.json`, and
/// emits at most one result event per folder (spec.md §4.D).
pub struct RecordingPipeline {
    recordings_dir: PathBuf,
    current_folder: Option<Recording>,
    processed: HashSet<PathBuf>,
}

impl RecordingPipeline {
    /// On startup, the current newest folder (if any) and its `meta.json`
    /// are marked already-processed so pre-existing results never fire.
    pub fn start(recordings_dir: PathBuf) -> Self {
        let mut pipeline = Self {
            recordings_dir,
            current_folder: None,
            processed: HashSet::new(),
        };

        if let Some(newest) = newest_recording(&pipeline.recordings_dir) {
            pipeline.processed.insert(newest.meta_path());
            pipeline.current_folder = Some(newest);
        }

        pipeline
    }

    pub fn recordings_dir(&self) -> &std::path::Path {
        &self.recordings_dir
    }

    pub fn current_folder(&self) -> Option<&Recording> {
        self.current_folder.as_ref()
    }

    /// Call when `recordings_dir` reports a change. Recomputes
    /// newest-by-creation-time; returns the new current folder when it
    /// changed so the caller can install a folder-level watcher.
    pub fn on_recordings_dir_changed(&mut self) -> Option<Recording> {
        let newest = newest_recording(&self.recordings_dir)?;
        let changed = match self.current_folder.as_ref() {
            Some(current) => current.folder != newest.folder,
            None => true,
        };

        if changed {
            self.current_folder = Some(newest.clone());
            Some(newest)
        } else {
            None
        }
    }

    /// Call on any event inside the current folder. A read is accepted
    /// only once `meta.json` parses and `duration > 0`; partial writes are
    /// silently ignored so the caller retries on the next event.
    pub fn on_folder_event(&mut self) -> Option<(PathBuf, Value)> {
        let current = self.current_folder.as_ref()?;
        let meta_path = current.meta_path();
        if self.processed.contains(&meta_path) {
            return None;
        }

        let meta = read_meta(&meta_path)?;
        if !is_valid_meta(&meta) {
            return None;
        }

        self.processed.insert(meta_path.clone());
        Some((current.folder.clone(), meta))
    }

    /// Tears down tracking when `recordings_dir` itself disappears,
    /// handing control back to the parent watcher (spec.md §4.D.6).
    pub fn teardown(&mut self) {
        self.current_folder = None;
    }
}
