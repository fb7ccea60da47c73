pub mod events;

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::action::registry::{ActionKind, ActionRegistry};
use crate::action::{dispatch_result_event, InputInjector};
use crate::bootstrap::AppPaths;
use crate::config::{self, Defaults, MacrowhisperConfig};
use crate::error::{AppError, AppResult};
pub use events::{CoordinatorEvent, ResultEvent};
use crate::ui::Notifier;
use crate::watch::Recording;

/// Default auto-disarm timeout for `auto_return_armed`/`scheduled_action`
/// one-shot state, spec.md §5.
const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// The single "coordinator" value spec.md §9 calls for: every piece of
/// global mutable state (config, registry, one-shot flags, processed-set via
/// the Recording Pipeline) lives here and is mutated only from the event
/// lane. Generalizes the teacher's `ControllerContext`/`ControllerState`.
pub struct Coordinator<I: InputInjector> {
    pub paths: AppPaths,
    pub config: MacrowhisperConfig,
    pub registry: ActionRegistry,
    pub injector: I,
    pub notifier: Notifier,
    mode: String,
    auto_return_armed: bool,
    auto_return_deadline: Option<Instant>,
    scheduled_action: Option<String>,
    scheduled_deadline: Option<Instant>,
    pub quit_requested: bool,
}

impl<I: InputInjector> Coordinator<I> {
    pub fn new(paths: AppPaths, config: MacrowhisperConfig, injector: I) -> AppResult<Self> {
        let registry = ActionRegistry::build(&config)?;
        let notifier = Notifier::new(!config.defaults.no_noti);
        Ok(Self {
            paths,
            config,
            registry,
            injector,
            notifier,
            mode: "default".to_owned(),
            auto_return_armed: false,
            auto_return_deadline: None,
            scheduled_action: None,
            scheduled_deadline: None,
            quit_requested: false,
        })
    }

    pub fn defaults(&self) -> &Defaults {
        &self.config.defaults
    }

    /// Dispatches one finalized recording result through the Action
    /// Dispatcher, then clears whichever one-shot state it consumed.
    pub fn handle_result_event(&mut self, event: &ResultEvent) {
        let scheduled = self.scheduled_action.clone();
        let outcome = dispatch_result_event(
            &event.meta,
            &self.registry,
            &self.config.defaults,
            &self.mode,
            scheduled.as_deref(),
            self.auto_return_armed,
            &self.injector,
        );

        match outcome {
            Ok(outcome) => {
                if outcome.action_executed.is_some() {
                    if self.scheduled_action.is_some() {
                        self.scheduled_action = None;
                        self.scheduled_deadline = None;
                    }
                    if self.auto_return_armed {
                        self.auto_return_armed = false;
                        self.auto_return_deadline = None;
                    }
                }
                if let Some(move_to) = outcome.move_to {
                    crate::housekeeping::moveto::schedule(event.folder.clone(), move_to);
                }
            }
            Err(error) => {
                tracing::warn!("action dispatch failed: {error}");
                let _ = self.notifier.notify("macrowhisper", &error.to_string());
            }
        }
    }

    /// Reloads the config document from disk. On a parse failure the
    /// previous in-memory config and registry are kept untouched, per
    /// spec.md §4.A / §7.
    pub fn reload_config(&mut self) -> AppResult<()> {
        let reloaded = config::reload(&self.paths.config_file)?;
        let registry = ActionRegistry::build(&reloaded)?;
        self.notifier = Notifier::new(!reloaded.defaults.no_noti);
        self.config = reloaded;
        self.registry = registry;
        Ok(())
    }

    pub fn save_config(&self) -> AppResult<()> {
        config::save(&self.paths.config_file, &self.config)
    }

    pub fn arm_auto_return(&mut self) {
        self.scheduled_action = None;
        self.scheduled_deadline = None;
        self.auto_return_armed = true;
        self.auto_return_deadline = Some(Instant::now() + ONE_SHOT_TIMEOUT);
    }

    pub fn disarm_auto_return(&mut self) {
        self.auto_return_armed = false;
        self.auto_return_deadline = None;
    }

    pub fn set_scheduled_action(&mut self, name: String) {
        self.auto_return_armed = false;
        self.auto_return_deadline = None;
        self.scheduled_action = Some(name);
        self.scheduled_deadline = Some(Instant::now() + ONE_SHOT_TIMEOUT);
    }

    /// Checked on every `Tick`: clears either one-shot flag once its
    /// deadline has passed (spec.md §5's cancellation timers).
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(deadline) = self.auto_return_deadline {
            if now >= deadline {
                self.auto_return_armed = false;
                self.auto_return_deadline = None;
            }
        }
        if let Some(deadline) = self.scheduled_deadline {
            if now >= deadline {
                self.scheduled_action = None;
                self.scheduled_deadline = None;
            }
        }
    }

    pub fn status_report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("macrowhisper daemon status".to_owned());
        lines.push(format!("  watch: {}", self.config.defaults.watch));
        lines.push(format!(
            "  active_action: {}",
            non_empty_or_dash(&self.config.defaults.active_action)
        ));
        lines.push(format!("  actions: {}", self.registry.len()));
        lines.push(format!("  auto_return_armed: {}", self.auto_return_armed));
        lines.push(format!(
            "  scheduled_action: {}",
            self.scheduled_action.as_deref().unwrap_or("-")
        ));
        lines.join("\n")
    }

    /// Handles one parsed control-socket request, returning the text to
    /// write back to the client (spec.md §4.H).
    pub fn handle_control(&mut self, command: &str, arguments: Option<&Value>) -> String {
        match command {
            "reloadConfig" => match self.reload_config() {
                Ok(()) => "ok: config reloaded".to_owned(),
                Err(error) => format!("error: {error}"),
            },
            "updateConfig" => self.handle_update_config(arguments),
            "status" => self.status_report(),
            "listActions" => self.list_actions(None),
            "listInserts" => self.list_actions(Some(ActionKind::Insert)),
            "listUrls" => self.list_actions(Some(ActionKind::Url)),
            "listShortcuts" => self.list_actions(Some(ActionKind::Shortcut)),
            "listShell" => self.list_actions(Some(ActionKind::ShellScript)),
            "listAppleScript" => self.list_actions(Some(ActionKind::AppleScript)),
            "addInsert" => self.add_action(arguments, |cfg, name| {
                cfg.inserts.insert(name, Default::default());
            }),
            "addUrl" => self.add_action(arguments, |cfg, name| {
                cfg.urls.insert(name, Default::default());
            }),
            "addShortcut" => self.add_action(arguments, |cfg, name| {
                cfg.shortcuts.insert(name, Default::default());
            }),
            "addShell" => self.add_action(arguments, |cfg, name| {
                cfg.scripts_shell.insert(name, Default::default());
            }),
            "addAppleScript" => self.add_action(arguments, |cfg, name| {
                cfg.scripts_as.insert(name, Default::default());
            }),
            "removeAction" => self.remove_action(arguments),
            "execAction" => self.exec_action(arguments),
            "getAction" => self.get_action(arguments),
            "getIcon" => self.get_icon(),
            "autoReturn" => self.handle_auto_return(arguments),
            "scheduleAction" => self.handle_schedule_action(arguments),
            "quit" => {
                self.quit_requested = true;
                "ok: shutting down".to_owned()
            }
            "serviceStatus" | "serviceInstall" | "serviceStart" | "serviceStop"
            | "serviceRestart" | "serviceUninstall" => crate::service::handle(command),
            other => format!("error: unknown command `{other}`"),
        }
    }

    fn list_actions(&self, kind: Option<ActionKind>) -> String {
        let active = self.config.defaults.active_action.trim();
        let mut names: Vec<&str> = match kind {
            Some(kind) => self.registry.of_kind(kind).map(|entry| entry.name.as_str()).collect(),
            None => self.registry.iter().map(|entry| entry.name.as_str()).collect(),
        };
        names.sort_unstable();

        if names.is_empty() {
            return "(none)".to_owned();
        }

        names
            .into_iter()
            .map(|name| {
                if name == active {
                    format!("{name} (active)")
                } else {
                    name.to_owned()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn add_action(
        &mut self,
        arguments: Option<&Value>,
        insert: impl FnOnce(&mut MacrowhisperConfig, String),
    ) -> String {
        let Some(name) = argument_str(arguments, "name") else {
            return "error: missing `name` argument".to_owned();
        };
        if !self.registry.name_is_free(name) {
            return format!("error: action name `{name}` is already in use");
        }

        insert(&mut self.config, name.to_owned());
        match self.commit_config_change() {
            Ok(()) => format!("ok: added `{name}`"),
            Err(error) => format!("error: {error}"),
        }
    }

    fn remove_action(&mut self, arguments: Option<&Value>) -> String {
        let Some(name) = argument_str(arguments, "name") else {
            return "error: missing `name` argument".to_owned();
        };

        let removed = self.config.inserts.remove(name).is_some()
            || self.config.urls.remove(name).is_some()
            || self.config.shortcuts.remove(name).is_some()
            || self.config.scripts_shell.remove(name).is_some()
            || self.config.scripts_as.remove(name).is_some();

        if !removed {
            return format!("error: unknown action `{name}`");
        }

        if self.config.defaults.active_action == name {
            self.config.defaults.active_action.clear();
        }

        match self.commit_config_change() {
            Ok(()) => format!("ok: removed `{name}`"),
            Err(error) => format!("error: {error}"),
        }
    }

    fn exec_action(&mut self, arguments: Option<&Value>) -> String {
        let Some(name) = argument_str(arguments, "name") else {
            return "error: missing `name` argument".to_owned();
        };
        if self.registry.get(name).is_none() {
            return format!("error: unknown action `{name}`");
        }

        let recordings_dir = crate::bootstrap::recordings_dir(&self.watch_root());
        let recording = crate::watch::recording::list_recordings(&recordings_dir)
            .into_iter()
            .find_map(|recording: Recording| {
                crate::watch::recording::read_meta(&recording.meta_path())
                    .filter(crate::watch::recording::is_valid_meta)
                    .map(|meta| (recording, meta))
            });

        let Some((recording, meta)) = recording else {
            return "error: no recording with a valid meta.json was found".to_owned();
        };

        self.disarm_auto_return();
        self.scheduled_action = None;
        self.scheduled_deadline = None;

        let outcome = dispatch_result_event(
            &meta,
            &self.registry,
            &self.config.defaults,
            &self.mode,
            Some(name),
            false,
            &self.injector,
        );

        match outcome {
            Ok(outcome) => {
                if let Some(move_to) = outcome.move_to {
                    crate::housekeeping::moveto::schedule(recording.folder, move_to);
                }
                format!("ok: executed `{name}`")
            }
            Err(error) => format!("error: {error}"),
        }
    }

    fn get_action(&self, arguments: Option<&Value>) -> String {
        match argument_str(arguments, "name") {
            Some(name) => match self.registry.get(name) {
                Some(entry) => entry.common.action.clone(),
                None => format!("error: unknown action `{name}`"),
            },
            None => self.config.defaults.active_action.clone(),
        }
    }

    fn get_icon(&self) -> String {
        let active = self.config.defaults.active_action.trim();
        if !active.is_empty() {
            if let Some(entry) = self.registry.get(active) {
                if let Some(icon) = &entry.common.icon {
                    return if icon == crate::config::INSERT_NONE {
                        String::new()
                    } else {
                        icon.clone()
                    };
                }
            }
        }
        self.config.defaults.icon.clone().unwrap_or_else(|| " ".to_owned())
    }

    fn handle_auto_return(&mut self, arguments: Option<&Value>) -> String {
        let enable = argument_bool(arguments, "enable").unwrap_or(true);
        if enable {
            self.arm_auto_return();
            "ok: auto-return armed".to_owned()
        } else {
            self.disarm_auto_return();
            "ok: auto-return disarmed".to_owned()
        }
    }

    fn handle_schedule_action(&mut self, arguments: Option<&Value>) -> String {
        let Some(name) = argument_str(arguments, "name") else {
            return "error: missing `name` argument".to_owned();
        };
        if self.registry.get(name).is_none() {
            return format!("error: unknown action `{name}`");
        }
        self.set_scheduled_action(name.to_owned());
        format!("ok: scheduled `{name}`")
    }

    fn handle_update_config(&mut self, arguments: Option<&Value>) -> String {
        let Some(Value::Object(fields)) = arguments else {
            return "error: `updateConfig` requires an object of fields".to_owned();
        };

        let mut patch = match serde_json::to_value(&self.config.defaults) {
            Ok(value) => value,
            Err(error) => return format!("error: {error}"),
        };
        if let Value::Object(existing) = &mut patch {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }

        let defaults: Defaults = match serde_json::from_value(patch) {
            Ok(defaults) => defaults,
            Err(error) => return format!("error: invalid defaults: {error}"),
        };

        if let Some(active) = non_empty(&defaults.active_action) {
            if self.registry.get(active).is_none() && !has_future_action(&self.config, active) {
                return format!("error: activeAction `{active}` does not name an existing action");
            }
        }

        self.config.defaults = defaults;
        match self.commit_config_change() {
            Ok(()) => "ok: config updated".to_owned(),
            Err(error) => format!("error: {error}"),
        }
    }

    fn commit_config_change(&mut self) -> AppResult<()> {
        let registry = ActionRegistry::build(&self.config)?;
        self.registry = registry;
        self.save_config()
    }

    fn watch_root(&self) -> std::path::PathBuf {
        crate::bootstrap::resolve_absolute(&self.config.defaults.watch)
            .unwrap_or_else(|_| std::path::PathBuf::from(&self.config.defaults.watch))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn non_empty_or_dash(value: &str) -> &str {
    non_empty(value).unwrap_or("-")
}

fn has_future_action(config: &MacrowhisperConfig, name: &str) -> bool {
    config.inserts.contains_key(name)
        || config.urls.contains_key(name)
        || config.shortcuts.contains_key(name)
        || config.scripts_shell.contains_key(name)
        || config.scripts_as.contains_key(name)
}

fn argument_str<'a>(arguments: Option<&'a Value>, key: &str) -> Option<&'a str> {
    arguments?.get(key)?.as_str()
}

fn argument_bool(arguments: Option<&Value>, key: &str) -> Option<bool> {
    arguments?.get(key)?.as_bool()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::injector::NullInputInjector;
    use crate::config::schema::{ActionCommon, InsertAction};
    use serde_json::json;

    fn sample_paths(root: &std::path::Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            config_file: root.join("config/macrowhisper.json"),
            socket_file: root.join("config/macrowhisper.sock"),
            lock_file: root.join("macrowhisper.lock"),
            autostart_file: root.join("autostart/macrowhisper.plist"),
        }
    }

    fn sample_coordinator(root: &std::path::Path) -> Coordinator<NullInputInjector> {
        let mut config = MacrowhisperConfig::default();
        config.inserts.insert(
            "pasteChat".to_owned(),
            InsertAction {
                common: ActionCommon {
                    action: "hello {{result}}".to_owned(),
                    ..Default::default()
                },
            },
        );
        config.defaults.active_action = "pasteChat".to_owned();
        Coordinator::new(sample_paths(root), config, NullInputInjector::new()).expect("coordinator")
    }

    #[test]
    fn scheduling_an_action_clears_auto_return_and_vice_versa() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut coordinator = sample_coordinator(temp.path());

        coordinator.arm_auto_return();
        assert!(coordinator.auto_return_armed);

        coordinator.set_scheduled_action("pasteChat".to_owned());
        assert!(!coordinator.auto_return_armed);
        assert_eq!(coordinator.scheduled_action.as_deref(), Some("pasteChat"));

        coordinator.arm_auto_return();
        assert!(coordinator.scheduled_action.is_none());
    }

    #[test]
    fn handle_result_event_consumes_scheduled_action() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut coordinator = sample_coordinator(temp.path());
        coordinator.set_scheduled_action("pasteChat".to_owned());

        let event = ResultEvent {
            folder: temp.path().join("rec-1"),
            meta: json!({"duration": 1.0, "result": "hi"}),
        };
        coordinator.handle_result_event(&event);
        assert!(coordinator.scheduled_action.is_none());
    }

    #[test]
    fn list_actions_marks_the_active_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let coordinator = sample_coordinator(temp.path());
        let listing = coordinator.list_actions(None);
        assert!(listing.contains("pasteChat (active)"));
    }

    #[test]
    fn add_action_rejects_a_name_already_in_use() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut coordinator = sample_coordinator(temp.path());
        let response = coordinator.handle_control("addUrl", Some(&json!({"name": "pasteChat"})));
        assert!(response.starts_with("error:"));
    }

    #[test]
    fn get_action_returns_active_action_name_when_no_name_given() {
        let temp = tempfile::tempdir().expect("tempdir");
        let coordinator = sample_coordinator(temp.path());
        assert_eq!(coordinator.handle_control("getAction", None), "pasteChat");
    }

    #[test]
    fn get_icon_maps_explicit_none_sentinel_to_empty_string() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut coordinator = sample_coordinator(temp.path());
        coordinator.config.inserts.get_mut("pasteChat").expect("entry").common.icon =
            Some(".none".to_owned());
        coordinator.registry = ActionRegistry::build(&coordinator.config).expect("rebuild");

        assert_eq!(coordinator.handle_control("getIcon", None), "");
    }
}
