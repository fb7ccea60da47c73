use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::schema::MacrowhisperConfig;
use crate::error::{AppError, AppResult};

/// Set just before `save` renames the temp file into place; cleared by the
/// config watcher the next time its callback fires. Prevents the daemon's
/// own writes from being mistaken for an external edit (spec.md §4.A).
pub static SUPPRESS_NEXT_RELOAD: AtomicBool = AtomicBool::new(false);

pub fn arm_self_write_suppression() {
    SUPPRESS_NEXT_RELOAD.store(true, Ordering::SeqCst);
}

/// Consumes the suppression flag, returning whether it had been armed.
pub fn take_self_write_suppression() -> bool {
    SUPPRESS_NEXT_RELOAD.swap(false, Ordering::SeqCst)
}

/// Load the config document, writing defaults if no file exists yet.
///
/// On a parse failure the caller keeps its in-memory defaults and must not
/// call `save` until a subsequent `load` succeeds — this protects the
/// user's on-disk edits from being clobbered (spec.md §4.A / §7).
pub fn load_or_init(path: &Path) -> AppResult<MacrowhisperConfig> {
    if !path.exists() {
        let defaults = MacrowhisperConfig::default();
        save(path, &defaults)?;
        return Ok(defaults);
    }

    let raw = fs::read_to_string(path)?;
    let config: MacrowhisperConfig = serde_json::from_str(&raw)?;
    Ok(config)
}

/// Parse a config document without the "write defaults if missing" fallback;
/// used by the live-reload path, which must distinguish "missing" (ignore)
/// from "malformed" (keep previous in-memory config, per spec.md §4.A).
pub fn reload(path: &Path) -> AppResult<MacrowhisperConfig> {
    let raw = fs::read_to_string(path)?;
    let config: MacrowhisperConfig = serde_json::from_str(&raw)?;
    Ok(config)
}

/// Atomically write the config document: write to a sibling temp file, then
/// rename over the target (spec.md §4.A).
pub fn save(path: &Path, config: &MacrowhisperConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pretty = render_pretty_sorted(config)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(pretty.as_bytes())?;
    temp.flush()?;

    arm_self_write_suppression();
    temp.persist(path)
        .map_err(|error| AppError::Io(error.error))?;

    Ok(())
}

/// Render as pretty-printed JSON with object keys sorted and explicit nulls
/// preserved, matching spec.md §6. `serde_json::Value`'s default map is a
/// `BTreeMap`, so round-tripping through `Value` sorts every nested object.
fn render_pretty_sorted(config: &MacrowhisperConfig) -> AppResult<String> {
    let value = serde_json::to_value(config)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
