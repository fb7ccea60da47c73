use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use serde_json::Value;

use crate::action::injector::{InputInjector, NullInputInjector};
#[cfg(target_os = "macos")]
use crate::action::injector::ProcessInputInjector;
use crate::action::registry::ActionRegistry;
use crate::bootstrap::{recordings_dir, resolve_absolute, AppPaths};
use crate::cli::RelayCommand;
use crate::config::load::take_self_write_suppression;
use crate::config::{load_or_init, Defaults, MacrowhisperConfig};
use crate::coordinator::{Coordinator, CoordinatorEvent, ResultEvent};
use crate::error::{AppError, AppResult};
use crate::housekeeping::retention;
use crate::lock::SingleInstanceLock;
use crate::socket::client as socket_client;
use crate::socket::server::{spawn_health_timer, ControlMessage, SocketServer};
use crate::watch::parent::recordings_subdir_exists;
use crate::watch::{FsWatcher, ParentWatcher, RecordingPipeline, WatchSignal};

/// How often the event lane wakes up to check one-shot-state deadlines
/// (spec.md §5's cancellation timers).
const TICK_INTERVAL: Duration = Duration::from_millis(500);
/// Default control-socket health-check period, spec.md §4.H.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

#[cfg(target_os = "macos")]
type PlatformInjector = ProcessInputInjector;
#[cfg(not(target_os = "macos"))]
type PlatformInjector = NullInputInjector;

fn platform_injector() -> PlatformInjector {
    PlatformInjector::new()
}

/// Entry point shared by the daemon and CLI code paths: the single-instance
/// lock decides which one this invocation becomes (spec.md §4.I).
pub fn run(paths: AppPaths, relay: Option<RelayCommand>) -> AppResult<()> {
    match SingleInstanceLock::try_acquire(&paths.lock_file)? {
        Some(lock) => run_daemon(paths, lock),
        None => run_cli(&paths, relay),
    }
}

/// This process lost the lock race: become a one-shot socket client. A CLI
/// invocation with no relayable flag defaults to `status`, which is the
/// friendliest response to a bare re-invocation of an already-running daemon.
fn run_cli(paths: &AppPaths, relay: Option<RelayCommand>) -> AppResult<()> {
    let relay = relay.unwrap_or(RelayCommand {
        command: "status".to_owned(),
        arguments: None,
    });

    if !socket_client::daemon_is_running(&paths.socket_file) {
        return Err(AppError::Fatal("macrowhisper is not running".to_owned()));
    }

    let response = socket_client::send(&paths.socket_file, &relay.command, relay.arguments)?;
    println!("{response}");
    Ok(())
}

/// Loads the config document, falling back to in-memory defaults (without
/// touching the file on disk) when it fails to parse or fails to produce a
/// valid action registry — spec.md §4.A / §7's `ConfigParseError` contract.
fn load_config_with_recovery(path: &Path) -> MacrowhisperConfig {
    let config = match load_or_init(path) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(
                "config at {} failed to parse, keeping defaults until a corrected edit is saved: {error}",
                path.display()
            );
            return MacrowhisperConfig::default();
        }
    };

    match ActionRegistry::build(&config) {
        Ok(_) => config,
        Err(error) => {
            tracing::error!(
                "config at {} is invalid ({error}), keeping defaults until a corrected edit is saved",
                path.display()
            );
            MacrowhisperConfig::default()
        }
    }
}

fn resolve_watch_root(defaults: &Defaults) -> PathBuf {
    resolve_absolute(&defaults.watch).unwrap_or_else(|_| PathBuf::from(&defaults.watch))
}

/// Forwards every item a worker channel produces into the single
/// coordinator event lane, translated through `wrap`. This is how every
/// watcher, the control socket, and the tick timer all funnel into one
/// `recv()` loop (spec.md §5).
fn forward<T, F>(rx: Receiver<T>, tx: Sender<CoordinatorEvent>, wrap: F)
where
    T: Send + 'static,
    F: Fn(T) -> CoordinatorEvent + Send + 'static,
{
    thread::spawn(move || {
        while let Ok(item) = rx.recv() {
            if tx.send(wrap(item)).is_err() {
                break;
            }
        }
    });
}

fn watch_parent(root: PathBuf, event_tx: Sender<CoordinatorEvent>) -> AppResult<ParentWatcher> {
    let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
    let watcher = ParentWatcher::start(root, signal_tx)?;
    forward(signal_rx, event_tx, CoordinatorEvent::ParentSignal);
    Ok(watcher)
}

fn watch_recordings_dir(dir: PathBuf, event_tx: Sender<CoordinatorEvent>) -> AppResult<FsWatcher> {
    let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
    let watcher = FsWatcher::watch(dir, signal_tx)?;
    forward(signal_rx, event_tx, CoordinatorEvent::RecordingsDirSignal);
    Ok(watcher)
}

fn watch_folder(folder: PathBuf, event_tx: Sender<CoordinatorEvent>) -> AppResult<FsWatcher> {
    let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
    let watcher = FsWatcher::watch(folder, signal_tx)?;
    forward(signal_rx, event_tx, CoordinatorEvent::FolderSignal);
    Ok(watcher)
}

/// Which of (C) Parent Watcher or (D) Recording Pipeline currently owns the
/// watch root, per spec.md §4.C/§4.D's handoff. `Transitioning` is a
/// momentary placeholder only ever observed inside a single transition
/// method, never across an event-loop iteration boundary.
enum WatchPhase {
    WaitingForRecordings(ParentWatcher),
    Active {
        recordings_watcher: FsWatcher,
        pipeline: RecordingPipeline,
        folder_watcher: Option<FsWatcher>,
    },
    Transitioning,
}

/// Owns every live watcher below the config store: the parent-or-recordings
/// handoff (C/D) and, once active, the Recording Pipeline's processed-set.
struct WatchState {
    root: PathBuf,
    phase: WatchPhase,
}

impl WatchState {
    fn start(watch_str: &str, event_tx: Sender<CoordinatorEvent>) -> AppResult<Self> {
        let root = resolve_absolute(watch_str).unwrap_or_else(|_| PathBuf::from(watch_str));
        Self::start_from_root(root, event_tx)
    }

    fn start_from_root(root: PathBuf, event_tx: Sender<CoordinatorEvent>) -> AppResult<Self> {
        let phase = if recordings_subdir_exists(&root) {
            Self::enter_active(&root, &event_tx)?
        } else {
            WatchPhase::WaitingForRecordings(watch_parent(root.clone(), event_tx)?)
        };
        Ok(Self { root, phase })
    }

    fn enter_active(root: &Path, event_tx: &Sender<CoordinatorEvent>) -> AppResult<WatchPhase> {
        let recordings = recordings_dir(root);
        let pipeline = RecordingPipeline::start(recordings.clone());
        let recordings_watcher = watch_recordings_dir(recordings, event_tx.clone())?;
        let folder_watcher = match pipeline.current_folder() {
            Some(recording) => Some(watch_folder(recording.folder.clone(), event_tx.clone())?),
            None => None,
        };
        Ok(WatchPhase::Active {
            recordings_watcher,
            pipeline,
            folder_watcher,
        })
    }

    fn recordings_dir(&self) -> PathBuf {
        recordings_dir(&self.root)
    }

    /// (C): the `recordings` sub-directory appeared under the watch root.
    fn on_parent_signal(&mut self, signal: WatchSignal, event_tx: &Sender<CoordinatorEvent>) -> AppResult<()> {
        if !matches!(signal, WatchSignal::Changed(_)) {
            return Ok(());
        }
        if !matches!(self.phase, WatchPhase::WaitingForRecordings(_)) {
            return Ok(());
        }
        if !recordings_subdir_exists(&self.root) {
            return Ok(());
        }

        let previous = std::mem::replace(&mut self.phase, WatchPhase::Transitioning);
        if let WatchPhase::WaitingForRecordings(parent) = previous {
            parent.stop();
        }
        self.phase = Self::enter_active(&self.root, event_tx)?;
        Ok(())
    }

    /// (D.1): a new sub-folder may have appeared under `recordings`, or the
    /// directory itself vanished (spec.md §4.D.6 hands control back to C).
    fn on_recordings_dir_signal(&mut self, signal: WatchSignal, event_tx: &Sender<CoordinatorEvent>) -> AppResult<()> {
        match signal {
            WatchSignal::Missing(_) => self.fall_back_to_waiting(event_tx),
            WatchSignal::Changed(_) => {
                let WatchPhase::Active { pipeline, folder_watcher, .. } = &mut self.phase else {
                    return Ok(());
                };
                if let Some(new_current) = pipeline.on_recordings_dir_changed() {
                    if let Some(old) = folder_watcher.take() {
                        old.stop();
                    }
                    *folder_watcher = Some(watch_folder(new_current.folder, event_tx.clone())?);
                }
                Ok(())
            }
        }
    }

    /// (D.3-5): an event inside the currently-tracked folder; returns the
    /// accepted `(folder, meta)` pair exactly once per folder.
    fn on_folder_signal(&mut self, signal: WatchSignal) -> Option<(PathBuf, Value)> {
        let WatchPhase::Active { pipeline, .. } = &mut self.phase else {
            return None;
        };
        match signal {
            WatchSignal::Changed(_) => pipeline.on_folder_event(),
            WatchSignal::Missing(_) => None,
        }
    }

    fn fall_back_to_waiting(&mut self, event_tx: &Sender<CoordinatorEvent>) -> AppResult<()> {
        if !matches!(self.phase, WatchPhase::Active { .. }) {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.phase, WatchPhase::Transitioning);
        if let WatchPhase::Active { recordings_watcher, folder_watcher, .. } = previous {
            recordings_watcher.stop();
            if let Some(folder_watcher) = folder_watcher {
                folder_watcher.stop();
            }
        }
        self.phase = WatchPhase::WaitingForRecordings(watch_parent(self.root.clone(), event_tx.clone())?);
        Ok(())
    }

    fn stop(self) {
        match self.phase {
            WatchPhase::WaitingForRecordings(parent) => parent.stop(),
            WatchPhase::Active { recordings_watcher, folder_watcher, .. } => {
                recordings_watcher.stop();
                if let Some(folder_watcher) = folder_watcher {
                    folder_watcher.stop();
                }
            }
            WatchPhase::Transitioning => {}
        }
    }
}

/// Tears down and rebuilds every watcher below the config store when
/// `defaults.watch` changed, per spec.md §2's "(A) changes propagate to
/// (D) when the watch root changes."
fn rewatch_if_root_changed(
    watch_state: &mut Option<WatchState>,
    defaults: &Defaults,
    event_tx: &Sender<CoordinatorEvent>,
) -> AppResult<()> {
    let new_root = resolve_watch_root(defaults);
    let changed = watch_state.as_ref().map(|state| state.root != new_root).unwrap_or(true);
    if !changed {
        return Ok(());
    }

    if let Some(old) = watch_state.take() {
        old.stop();
    }
    *watch_state = Some(WatchState::start_from_root(new_root, event_tx.clone())?);
    Ok(())
}

fn handle_config_signal(
    signal: WatchSignal,
    coordinator: &mut Coordinator<PlatformInjector>,
    watch_state: &mut Option<WatchState>,
    event_tx: &Sender<CoordinatorEvent>,
) -> AppResult<()> {
    if take_self_write_suppression() {
        return Ok(());
    }

    match signal {
        WatchSignal::Changed(_) => match coordinator.reload_config() {
            Ok(()) => rewatch_if_root_changed(watch_state, coordinator.defaults(), event_tx),
            Err(error) => {
                tracing::warn!("config reload failed, keeping in-memory config: {error}");
                let _ = coordinator.notifier.notify("macrowhisper", &format!("config error: {error}"));
                Ok(())
            }
        },
        WatchSignal::Missing(path) => {
            tracing::warn!("config file missing: {}", path.display());
            Ok(())
        }
    }
}

fn run_daemon(paths: AppPaths, lock: SingleInstanceLock) -> AppResult<()> {
    let config = load_config_with_recovery(&paths.config_file);
    let injector = platform_injector();
    let mut coordinator = Coordinator::new(paths.clone(), config, injector)?;

    let (event_tx, event_rx) = crossbeam_channel::unbounded::<CoordinatorEvent>();

    let (control_tx, control_rx) = crossbeam_channel::unbounded::<ControlMessage>();
    let _socket_join = SocketServer::spawn(paths.socket_file.clone(), control_tx)?;
    forward(control_rx, event_tx.clone(), |message: ControlMessage| {
        CoordinatorEvent::Control {
            request: message.request,
            reply_tx: message.reply_tx,
        }
    });
    let _health_join = spawn_health_timer(paths.socket_file.clone(), HEALTH_CHECK_INTERVAL);

    let (config_signal_tx, config_signal_rx) = crossbeam_channel::unbounded();
    let config_watcher = FsWatcher::watch(paths.config_file.clone(), config_signal_tx)?;
    forward(config_signal_rx, event_tx.clone(), CoordinatorEvent::ConfigSignal);

    let shutdown_tx = event_tx.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(CoordinatorEvent::Shutdown);
    })
    .map_err(|error| AppError::Fatal(format!("failed to register signal handler: {error}")))?;

    let tick_tx = event_tx.clone();
    thread::Builder::new()
        .name("macrowhisper-tick".to_owned())
        .spawn(move || loop {
            thread::sleep(TICK_INTERVAL);
            if tick_tx.send(CoordinatorEvent::Tick).is_err() {
                break;
            }
        })
        .map_err(|error| AppError::Fatal(format!("failed to spawn tick timer: {error}")))?;

    let mut watch_state = Some(WatchState::start(&coordinator.defaults().watch.clone(), event_tx.clone())?);

    let result = event_loop(&mut coordinator, &mut watch_state, &event_rx, &event_tx);

    config_watcher.stop();
    if let Some(state) = watch_state.take() {
        state.stop();
    }
    drop(lock);
    result
}

fn event_loop(
    coordinator: &mut Coordinator<PlatformInjector>,
    watch_state: &mut Option<WatchState>,
    event_rx: &Receiver<CoordinatorEvent>,
    event_tx: &Sender<CoordinatorEvent>,
) -> AppResult<()> {
    loop {
        let event = event_rx
            .recv()
            .map_err(|_| AppError::ChannelClosed("coordinator event channel closed".to_owned()))?;

        match event {
            CoordinatorEvent::ParentSignal(signal) => {
                if let Some(state) = watch_state.as_mut() {
                    state.on_parent_signal(signal, event_tx)?;
                }
            }
            CoordinatorEvent::RecordingsDirSignal(signal) => {
                if let Some(state) = watch_state.as_mut() {
                    state.on_recordings_dir_signal(signal, event_tx)?;
                }
            }
            CoordinatorEvent::FolderSignal(signal) => {
                let accepted = watch_state.as_mut().and_then(|state| state.on_folder_signal(signal));
                if let Some((folder, meta)) = accepted {
                    let result_event = ResultEvent { folder, meta };
                    coordinator.handle_result_event(&result_event);

                    if let Some(days) = coordinator.defaults().history {
                        if let Some(state) = watch_state.as_ref() {
                            let recordings_dir = state.recordings_dir();
                            thread::spawn(move || retention::enforce(&recordings_dir, days));
                        }
                    }
                }
            }
            CoordinatorEvent::ConfigSignal(signal) => {
                handle_config_signal(signal, coordinator, watch_state, event_tx)?;
            }
            CoordinatorEvent::Control { request, reply_tx } => {
                let response = coordinator.handle_control(&request.command, request.arguments.as_ref());
                let _ = reply_tx.send(response);
                rewatch_if_root_changed(watch_state, coordinator.defaults(), event_tx)?;
                if coordinator.quit_requested {
                    thread::sleep(Duration::from_millis(200));
                    return Ok(());
                }
            }
            CoordinatorEvent::Tick => coordinator.tick(),
            CoordinatorEvent::Shutdown => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ActionCommon, InsertAction};
    use std::fs;

    fn sample_paths(root: &Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            config_file: root.join("config/macrowhisper.json"),
            socket_file: root.join("config/macrowhisper.sock"),
            lock_file: root.join("macrowhisper.lock"),
            autostart_file: root.join("autostart/macrowhisper.plist"),
        }
    }

    #[test]
    fn load_config_with_recovery_falls_back_to_defaults_on_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("macrowhisper.json");
        fs::write(&path, "{ not valid").expect("write malformed");

        let config = load_config_with_recovery(&path);
        assert_eq!(config.defaults.watch, "");
        let raw = fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, "{ not valid", "malformed file must not be overwritten");
    }

    #[test]
    fn load_config_with_recovery_falls_back_on_invalid_action_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("macrowhisper.json");
        fs::write(&path, r#"{"defaults":{"activeAction":"missing"}}"#).expect("write");

        let config = load_config_with_recovery(&path);
        assert!(config.defaults.active_action.is_empty());
    }

    #[test]
    fn watch_state_starts_waiting_when_recordings_dir_is_absent() {
        let base = tempfile::tempdir().expect("tempdir");
        let root = base.path().join("superwhisper");
        let (tx, _rx) = crossbeam_channel::unbounded();

        let state = WatchState::start_from_root(root, tx).expect("start");
        assert!(matches!(state.phase, WatchPhase::WaitingForRecordings(_)));
        state.stop();
    }

    #[test]
    fn watch_state_enters_active_when_recordings_dir_already_exists() {
        let base = tempfile::tempdir().expect("tempdir");
        let root = base.path().join("superwhisper");
        fs::create_dir_all(root.join("recordings")).expect("create recordings dir");
        let (tx, _rx) = crossbeam_channel::unbounded();

        let state = WatchState::start_from_root(root, tx).expect("start");
        assert!(matches!(state.phase, WatchPhase::Active { .. }));
        state.stop();
    }

    #[test]
    fn parent_signal_transitions_to_active_once_recordings_dir_appears() {
        let base = tempfile::tempdir().expect("tempdir");
        let root = base.path().join("superwhisper");
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut state = WatchState::start_from_root(root.clone(), tx.clone()).expect("start");
        assert!(matches!(state.phase, WatchPhase::WaitingForRecordings(_)));

        fs::create_dir_all(root.join("recordings")).expect("create recordings dir");
        state
            .on_parent_signal(WatchSignal::Changed(root.clone()), &tx)
            .expect("transition");
        assert!(matches!(state.phase, WatchPhase::Active { .. }));
        state.stop();
    }

    #[test]
    fn rewatch_if_root_changed_is_a_no_op_when_root_is_unchanged() {
        let base = tempfile::tempdir().expect("tempdir");
        let root = base.path().join("superwhisper");
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut state = Some(WatchState::start(root.to_str().expect("utf8"), tx.clone()).expect("start"));

        let defaults = Defaults {
            watch: root.to_str().expect("utf8").to_owned(),
            ..Default::default()
        };
        rewatch_if_root_changed(&mut state, &defaults, &tx).expect("rewatch");
        assert!(state.is_some());
        state.take().expect("state").stop();
    }

    #[test]
    fn end_to_end_result_event_flows_through_event_loop() {
        let base = tempfile::tempdir().expect("tempdir");
        let paths = sample_paths(base.path());
        fs::create_dir_all(&paths.config_dir).expect("create config dir");

        let watch_root = base.path().join("superwhisper");
        let recordings = watch_root.join("recordings");
        fs::create_dir_all(&recordings).expect("create recordings dir");
        let folder = recordings.join("rec-1");
        fs::create_dir_all(&folder).expect("create folder");

        let mut config = MacrowhisperConfig::default();
        config.defaults.watch = watch_root.to_str().expect("utf8").to_owned();
        config.defaults.active_action = "pasteChat".to_owned();
        config.inserts.insert(
            "pasteChat".to_owned(),
            InsertAction {
                common: ActionCommon {
                    action: "{{result}}".to_owned(),
                    restore_clipboard: Some(false),
                    ..Default::default()
                },
            },
        );

        let injector = NullInputInjector::new();
        let mut coordinator = Coordinator::new(paths, config, injector).expect("coordinator");

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mut watch_state = Some(WatchState::start_from_root(watch_root, event_tx.clone()).expect("watch state"));

        fs::write(folder.join("meta.json"), r#"{"duration":1.5,"result":"hello there"}"#)
            .expect("write meta");

        event_tx
            .send(CoordinatorEvent::FolderSignal(WatchSignal::Changed(folder.clone())))
            .expect("send folder signal");
        event_tx.send(CoordinatorEvent::Shutdown).expect("send shutdown");

        event_loop(&mut coordinator, &mut watch_state, &event_rx, &event_tx).expect("event loop");

        assert_eq!(
            coordinator.injector.read_clipboard().expect("clipboard"),
            "hello there"
        );

        if let Some(state) = watch_state.take() {
            state.stop();
        }
    }
}
