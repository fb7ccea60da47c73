use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{AppError, AppResult};

/// Well-known on-disk locations, per spec.md §6.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub socket_file: PathBuf,
    pub lock_file: PathBuf,
    pub autostart_file: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> AppResult<Self> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| AppError::Config("unable to resolve base directories".to_owned()))?;

        let config_dir = base_dirs.config_dir().join("macrowhisper");
        let config_file = config_dir.join("macrowhisper.json");
        let socket_file = config_dir.join("macrowhisper.sock");
        let lock_file = PathBuf::from("/tmp/macrowhisper.lock");

        let autostart_file = if cfg!(target_os = "macos") {
            base_dirs
                .home_dir()
                .join("Library")
                .join("LaunchAgents")
                .join("com.macrowhisper.daemon.plist")
        } else {
            base_dirs
                .config_dir()
                .join("autostart")
                .join("macrowhisper.desktop")
        };

        Ok(Self {
            config_dir,
            config_file,
            socket_file,
            lock_file,
            autostart_file,
        })
    }

    pub fn ensure_dirs(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        if let Some(parent) = self.autostart_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Tilde-expand a path string against the current user's home directory.
///
/// Only a leading `~` or `~/...` is expanded; `~user` forms are left as-is.
pub fn expand_tilde(raw: &str) -> AppResult<PathBuf> {
    if raw == "~" || raw.starts_with("~/") {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| AppError::Config("unable to resolve base directories".to_owned()))?;
        let home = base_dirs.home_dir();
        return Ok(if raw == "~" {
            home.to_path_buf()
        } else {
            home.join(&raw[2..])
        });
    }
    Ok(PathBuf::from(raw))
}

/// Resolve a possibly-relative, possibly-`~`-prefixed path string to an absolute path.
pub fn resolve_absolute(raw: &str) -> AppResult<PathBuf> {
    let expanded = expand_tilde(raw)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(expanded))
    }
}

pub fn recordings_dir(watch_root: &Path) -> PathBuf {
    watch_root.join("recordings")
}
