use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::{MOVE_TO_DELETE, MOVE_TO_NONE};

/// Recording folders settle for this long before `moveTo` touches them,
/// spec.md §4.G, so the dictation app has a chance to finish any trailing
/// writes to the folder.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Runs the post-action folder disposition on its own worker thread, per
/// spec.md §5's "filesystem side-effects of moveTo" worker. Errors are
/// logged; they never feed back into the event lane.
pub fn schedule(folder: PathBuf, move_to: String) {
    thread::Builder::new()
        .name("macrowhisper-moveto".to_owned())
        .spawn(move || {
            thread::sleep(SETTLE_DELAY);
            if let Err(error) = apply(&folder, &move_to) {
                tracing::warn!(
                    "moveTo failed for {}: {error}",
                    folder.display()
                );
            }
        })
        .expect("failed to spawn moveTo worker");
}

fn apply(folder: &Path, move_to: &str) -> std::io::Result<()> {
    let trimmed = move_to.trim();

    if trimmed == MOVE_TO_DELETE {
        if folder.exists() {
            fs::remove_dir_all(folder)?;
        }
        return Ok(());
    }

    if trimmed.is_empty() || trimmed == MOVE_TO_NONE {
        return Ok(());
    }

    let destination_dir = PathBuf::from(trimmed);
    fs::create_dir_all(&destination_dir)?;

    let Some(name) = folder.file_name() else {
        return Ok(());
    };
    let destination = destination_dir.join(name);
    if destination.exists() {
        if destination.is_dir() {
            fs::remove_dir_all(&destination)?;
        } else {
            fs::remove_file(&destination)?;
        }
    }

    fs::rename(folder, &destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_until<F: Fn() -> bool>(predicate: F) {
        let start = Instant::now();
        while !predicate() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn delete_removes_the_folder() {
        let base = tempfile::tempdir().expect("tempdir");
        let folder = base.path().join("rec-1");
        fs::create_dir(&folder).expect("create folder");

        schedule(folder.clone(), MOVE_TO_DELETE.to_owned());
        wait_until(|| !folder.exists());
        assert!(!folder.exists());
    }

    #[test]
    fn none_sentinel_keeps_the_folder_in_place() {
        let base = tempfile::tempdir().expect("tempdir");
        let folder = base.path().join("rec-1");
        fs::create_dir(&folder).expect("create folder");

        apply(&folder, MOVE_TO_NONE).expect("apply");
        assert!(folder.exists());
    }

    #[test]
    fn destination_move_creates_directory_and_overwrites_existing_target() {
        let base = tempfile::tempdir().expect("tempdir");
        let folder = base.path().join("rec-1");
        fs::create_dir(&folder).expect("create folder");
        fs::write(folder.join("meta.json"), "{}").expect("write meta");

        let destination_root = base.path().join("archive");
        let existing_target = destination_root.join("rec-1");
        fs::create_dir_all(&existing_target).expect("pre-create target");

        apply(&folder, destination_root.to_str().expect("utf8 path")).expect("apply");

        assert!(!folder.exists());
        assert!(existing_target.join("meta.json").exists());
    }
}
