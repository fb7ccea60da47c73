use std::io::{Read, Write as _};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::socket::protocol::Request;

/// Sends one request to a running daemon's control socket and returns its
/// raw text response. Used by the CLI surface to relay every flag that
/// isn't `--start-service`-family into a running instance (spec.md §6).
pub fn send(socket_path: &Path, command: &str, arguments: Option<Value>) -> AppResult<String> {
    let mut stream = UnixStream::connect(socket_path).map_err(|error| {
        AppError::Socket(format!(
            "no running daemon at {}: {error}",
            socket_path.display()
        ))
    })?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let request = Request {
        command: command.to_owned(),
        arguments,
    };
    let payload = serde_json::to_vec(&request)?;
    stream.write_all(&payload)?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

/// True when a daemon appears to be listening, without sending it a request.
pub fn daemon_is_running(socket_path: &Path) -> bool {
    UnixStream::connect(socket_path).is_ok()
}
