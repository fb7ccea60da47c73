use std::process::Command;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// The foreground application at event time, captured once per result
/// event per spec.md §4.G.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontApp {
    pub name: String,
    pub bundle_id: String,
}

/// Abstract capability for key-event injection, clipboard access, and
/// accessibility focus inspection. Spec.md §1 calls these out as external
/// collaborators; this trait is their seam, the same shape as the
/// recording-capture trait a controller loop substitutes in tests.
pub trait InputInjector: Send + Sync {
    fn front_app(&self) -> AppResult<FrontApp>;
    fn focused_element_is_input(&self) -> AppResult<bool>;
    fn paste(&self, text: &str) -> AppResult<()>;
    fn type_keystrokes(&self, text: &str, char_delay: Duration) -> AppResult<()>;
    fn press_return(&self) -> AppResult<()>;
    fn press_escape(&self) -> AppResult<()>;
    fn read_clipboard(&self) -> AppResult<String>;
    fn write_clipboard(&self, text: &str) -> AppResult<()>;
}

/// macOS-style automation via `osascript`/`pbcopy`/`pbpaste` child
/// processes. Each call is a standalone subprocess, so there is no
/// thread-affinity requirement of its own (spec.md §5's "must run on the
/// OS main thread" note is satisfied trivially this way).
pub struct ProcessInputInjector;

impl ProcessInputInjector {
    pub fn new() -> Self {
        Self
    }

    fn run_osascript(&self, script: &str) -> AppResult<()> {
        let status = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .status()
            .map_err(|error| AppError::Injector(format!("osascript spawn failed: {error}")))?;
        if !status.success() {
            return Err(AppError::Injector(format!(
                "osascript exited with status {status}"
            )));
        }
        Ok(())
    }
}

impl Default for ProcessInputInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for ProcessInputInjector {
    fn front_app(&self) -> AppResult<FrontApp> {
        let script = r#"
            tell application "System Events"
                set frontApp to name of first application process whose frontmost is true
                set frontBundle to bundle identifier of first application process whose frontmost is true
            end tell
            return frontApp & "||" & frontBundle
        "#;
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|error| AppError::Injector(format!("osascript spawn failed: {error}")))?;
        if !output.status.success() {
            return Err(AppError::Injector(
                "osascript failed to resolve front app".to_owned(),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let mut parts = text.trim().splitn(2, "||");
        let name = parts.next().unwrap_or_default().to_owned();
        let bundle_id = parts.next().unwrap_or_default().to_owned();
        Ok(FrontApp { name, bundle_id })
    }

    fn focused_element_is_input(&self) -> AppResult<bool> {
        let script = r#"
            tell application "System Events"
                set roleOfFocused to role of (first UI element of (first application process whose frontmost is true) whose focused is true)
            end tell
            return roleOfFocused
        "#;
        let output = Command::new("osascript").arg("-e").arg(script).output();
        match output {
            Ok(output) if output.status.success() => {
                let role = String::from_utf8_lossy(&output.stdout);
                Ok(role.to_ascii_lowercase().contains("text"))
            }
            _ => Ok(false),
        }
    }

    fn paste(&self, text: &str) -> AppResult<()> {
        self.write_clipboard(text)?;
        self.run_osascript(
            r#"tell application "System Events" to keystroke "v" using command down"#,
        )
    }

    fn type_keystrokes(&self, text: &str, char_delay: Duration) -> AppResult<()> {
        for ch in text.chars() {
            if ch == '\n' {
                self.press_return()?;
            } else {
                let escaped = ch.to_string().replace('\\', "\\\\").replace('"', "\\\"");
                self.run_osascript(&format!(
                    r#"tell application "System Events" to keystroke "{escaped}""#
                ))?;
            }
            std::thread::sleep(char_delay);
        }
        Ok(())
    }

    fn press_return(&self) -> AppResult<()> {
        self.run_osascript(r#"tell application "System Events" to key code 36"#)
    }

    fn press_escape(&self) -> AppResult<()> {
        self.run_osascript(r#"tell application "System Events" to key code 53"#)
    }

    fn read_clipboard(&self) -> AppResult<String> {
        let output = Command::new("pbpaste")
            .output()
            .map_err(|error| AppError::Injector(format!("pbpaste spawn failed: {error}")))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn write_clipboard(&self, text: &str) -> AppResult<()> {
        use std::io::Write as _;

        let mut child = Command::new("pbcopy")
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|error| AppError::Injector(format!("pbcopy spawn failed: {error}")))?;
        child
            .stdin
            .take()
            .ok_or_else(|| AppError::Injector("pbcopy stdin unavailable".to_owned()))?
            .write_all(text.as_bytes())
            .map_err(|error| AppError::Injector(format!("pbcopy write failed: {error}")))?;
        let status = child
            .wait()
            .map_err(|error| AppError::Injector(format!("pbcopy wait failed: {error}")))?;
        if !status.success() {
            return Err(AppError::Injector(format!(
                "pbcopy exited with status {status}"
            )));
        }
        Ok(())
    }
}

/// Logging no-op used off-macOS and in tests.
#[derive(Debug, Default)]
pub struct NullInputInjector {
    clipboard: std::sync::Mutex<String>,
}

impl NullInputInjector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputInjector for NullInputInjector {
    fn front_app(&self) -> AppResult<FrontApp> {
        tracing::debug!("null injector: front_app");
        Ok(FrontApp::default())
    }

    fn focused_element_is_input(&self) -> AppResult<bool> {
        tracing::debug!("null injector: focused_element_is_input");
        Ok(false)
    }

    fn paste(&self, text: &str) -> AppResult<()> {
        tracing::info!(%text, "null injector: paste");
        self.write_clipboard(text)
    }

    fn type_keystrokes(&self, text: &str, _char_delay: Duration) -> AppResult<()> {
        tracing::info!(%text, "null injector: type_keystrokes");
        Ok(())
    }

    fn press_return(&self) -> AppResult<()> {
        tracing::debug!("null injector: press_return");
        Ok(())
    }

    fn press_escape(&self) -> AppResult<()> {
        tracing::debug!("null injector: press_escape");
        Ok(())
    }

    fn read_clipboard(&self) -> AppResult<String> {
        Ok(self.clipboard.lock().expect("clipboard lock").clone())
    }

    fn write_clipboard(&self, text: &str) -> AppResult<()> {
        *self.clipboard.lock().expect("clipboard lock") = text.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_injector_round_trips_clipboard() {
        let injector = NullInputInjector::new();
        injector.write_clipboard("hello").expect("write");
        assert_eq!(injector.read_clipboard().expect("read"), "hello");
    }

    #[test]
    fn null_injector_reports_no_focused_input() {
        let injector = NullInputInjector::new();
        assert!(!injector.focused_element_is_input().expect("query"));
    }
}
