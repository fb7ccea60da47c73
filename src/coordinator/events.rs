use std::path::PathBuf;

use crossbeam_channel::Sender;
use serde_json::Value;

use crate::socket::Request;
use crate::watch::WatchSignal;

/// Everything that can mutate coordinator state arrives as one of these,
/// read off a single `crossbeam_channel::Receiver` (spec.md §5's "serialized
/// event lane"). Generalizes the teacher's `ControllerEvent`.
pub enum CoordinatorEvent {
    /// Raw signal from the watcher on `<watch>`'s parent directory.
    ParentSignal(WatchSignal),
    /// Raw signal from the watcher on `<watch>/recordings` itself, used to
    /// detect the appearance of new sub-folders.
    RecordingsDirSignal(WatchSignal),
    /// Raw signal from the watcher on the current newest recording folder.
    FolderSignal(WatchSignal),
    /// Raw signal from the watcher on the config file itself.
    ConfigSignal(WatchSignal),
    /// A parsed control-socket request plus the oneshot reply channel the
    /// connection-handling thread is blocked on.
    Control { request: Request, reply_tx: Sender<String> },
    /// Fired periodically so one-shot-state deadlines can be checked.
    Tick,
    Shutdown,
}

/// A single accepted recording result, produced by the Recording Pipeline.
#[derive(Debug, Clone)]
pub struct ResultEvent {
    pub folder: PathBuf,
    pub meta: Value,
}
