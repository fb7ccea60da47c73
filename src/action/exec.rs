use std::io::Write as _;
use std::process::Command;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// `/bin/sh -c <script>`, per spec.md §4.G Shell execution.
pub fn run_shell(script: &str) -> AppResult<()> {
    let status = Command::new("/bin/sh")
        .arg("-c")
        .arg(script)
        .status()
        .map_err(|error| AppError::CommandFailed {
            command: "/bin/sh".to_owned(),
            reason: error.to_string(),
        })?;
    if !status.success() {
        return Err(AppError::ActionExecution(format!(
            "shell command exited with status {status}"
        )));
    }
    Ok(())
}

/// System AppleScript interpreter, `-e <script>`.
pub fn run_applescript(script: &str) -> AppResult<()> {
    let status = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .status()
        .map_err(|error| AppError::CommandFailed {
            command: "osascript".to_owned(),
            reason: error.to_string(),
        })?;
    if !status.success() {
        return Err(AppError::ActionExecution(format!(
            "osascript exited with status {status}"
        )));
    }
    Ok(())
}

/// Writes `payload` to a temp file, invokes `shortcuts run <name> -i <file>`,
/// and schedules temp-file deletion after a 2-second tail (spec.md §4.G).
pub fn run_shortcut(name: &str, payload: &str) -> AppResult<()> {
    let mut temp = tempfile::NamedTempFile::new()?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;
    let (_, path) = temp.keep().map_err(|error| AppError::Io(error.error))?;

    let status = Command::new("shortcuts")
        .arg("run")
        .arg(name)
        .arg("-i")
        .arg(&path)
        .status()
        .map_err(|error| AppError::CommandFailed {
            command: "shortcuts".to_owned(),
            reason: error.to_string(),
        });

    let cleanup_path = path.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(2));
        let _ = std::fs::remove_file(&cleanup_path);
    });

    match status? {
        status if status.success() => Ok(()),
        status => Err(AppError::ActionExecution(format!(
            "shortcuts run exited with status {status}"
        ))),
    }
}

/// Opens a URL via the system opener. `open_with` names an application to
/// hand the URL to; `background` passes the opener's background-open flag.
pub fn open_url(url: &str, open_with: Option<&str>, background: bool) -> AppResult<()> {
    let mut command = Command::new("open");
    if background {
        command.arg("-g");
    }
    if let Some(app) = open_with {
        command.arg("-a").arg(app);
    }
    command.arg(url);

    let status = command.status().map_err(|error| AppError::CommandFailed {
        command: "open".to_owned(),
        reason: error.to_string(),
    })?;
    if !status.success() {
        return Err(AppError::ActionExecution(format!(
            "open exited with status {status}"
        )));
    }
    Ok(())
}
