use std::fs;
use std::io::{Read, Write as _};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::error::{AppError, AppResult};
use crate::socket::protocol::{Request, MAX_REQUEST_BYTES};

/// One accepted connection's parsed request plus a oneshot reply channel,
/// forwarded into the coordinator's single event lane (spec.md §4.H).
pub struct ControlMessage {
    pub request: Request,
    pub reply_tx: Sender<String>,
}

pub struct SocketServer;

impl SocketServer {
    /// Binds the control socket and spawns its accept loop on its own
    /// thread. Each connection is handled synchronously: one request in,
    /// one response out, then close.
    pub fn spawn(socket_path: PathBuf, control_tx: Sender<ControlMessage>) -> AppResult<JoinHandle<()>> {
        let _ = fs::remove_file(&socket_path);

        let listener = UnixListener::bind(&socket_path)
            .map_err(|error| AppError::Socket(format!("bind {}: {error}", socket_path.display())))?;
        fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o777))
            .map_err(|error| AppError::Socket(format!("chmod socket: {error}")))?;

        let handle = thread::Builder::new()
            .name("macrowhisper-socket".to_owned())
            .spawn(move || {
                for connection in listener.incoming() {
                    match connection {
                        Ok(stream) => handle_connection(stream, &control_tx),
                        Err(error) => {
                            tracing::warn!("control socket accept failed: {error}");
                        }
                    }
                }
            })
            .map_err(|error| AppError::Socket(format!("spawn accept loop: {error}")))?;

        Ok(handle)
    }
}

fn handle_connection(mut stream: UnixStream, control_tx: &Sender<ControlMessage>) {
    let mut data = Vec::new();
    let mut limited = (&mut stream).take(MAX_REQUEST_BYTES as u64);
    if let Err(error) = limited.read_to_end(&mut data) {
        tracing::warn!("control socket read failed: {error}");
        return;
    }

    let request: Request = match serde_json::from_slice(&data) {
        Ok(request) => request,
        Err(error) => {
            let _ = write_response(&mut stream, &format!("error: malformed request: {error}"));
            return;
        }
    };

    let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
    if control_tx
        .send(ControlMessage { request, reply_tx })
        .is_err()
    {
        let _ = write_response(&mut stream, "error: daemon is shutting down");
        return;
    }

    match reply_rx.recv_timeout(Duration::from_secs(5)) {
        Ok(response) => {
            let _ = write_response(&mut stream, &response);
        }
        Err(_) => {
            let _ = write_response(&mut stream, "error: timed out waiting for daemon response");
        }
    }
}

fn write_response(stream: &mut UnixStream, response: &str) -> AppResult<()> {
    stream.write_all(response.as_bytes())?;
    stream.flush()?;
    Ok(())
}

/// Pings the socket with a `status` request every `interval`; on failure it
/// only logs — a repeated failure is surfaced to the caller via the
/// returned join handle finishing early, which `run_app` treats as a signal
/// to rebind the listener (spec.md §4.H).
pub fn spawn_health_timer(socket_path: PathBuf, interval: Duration) -> JoinHandle<()> {
    thread::Builder::new()
        .name("macrowhisper-socket-health".to_owned())
        .spawn(move || loop {
            thread::sleep(interval);
            match ping(&socket_path) {
                Ok(()) => tracing::debug!("control socket health check ok"),
                Err(error) => tracing::warn!("control socket health check failed: {error}"),
            }
        })
        .expect("failed to spawn control socket health timer")
}

fn ping(socket_path: &PathBuf) -> AppResult<()> {
    let mut stream = UnixStream::connect(socket_path)
        .map_err(|error| AppError::Socket(format!("health ping connect: {error}")))?;
    stream.write_all(br#"{"command":"status"}"#)?;
    stream.shutdown(std::net::Shutdown::Write)?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    Ok(())
}
