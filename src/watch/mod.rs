pub mod parent;
pub mod pipeline;
pub mod primitive;
pub mod recording;

pub use parent::ParentWatcher;
pub use pipeline::RecordingPipeline;
pub use primitive::{FsWatcher, WatchSignal};
pub use recording::Recording;
