use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};

/// Flat flag surface mirroring spec.md §6: the first invocation (no flag
/// implying a socket command) daemonizes implicitly via the single
/// instance lock; every other flag is relayed as one control-socket
/// command to an already-running instance.
#[derive(Debug, Parser, Default)]
#[command(name = "macrowhisper")]
#[command(about = "Watches a dictation app's recordings and dispatches configured actions")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub version: bool,

    #[arg(long)]
    pub reload: bool,

    #[arg(long)]
    pub status: bool,

    #[arg(long = "list-actions")]
    pub list_actions: bool,

    #[arg(long = "add-insert", value_name = "NAME")]
    pub add_insert: Option<String>,

    #[arg(long = "add-url", value_name = "NAME")]
    pub add_url: Option<String>,

    #[arg(long = "add-shortcut", value_name = "NAME")]
    pub add_shortcut: Option<String>,

    #[arg(long = "add-shell", value_name = "NAME")]
    pub add_shell: Option<String>,

    #[arg(long = "add-applescript", value_name = "NAME")]
    pub add_applescript: Option<String>,

    #[arg(long = "remove-action", value_name = "NAME")]
    pub remove_action: Option<String>,

    #[arg(long = "exec-action", value_name = "NAME")]
    pub exec_action: Option<String>,

    #[arg(long = "action", value_name = "NAME")]
    pub set_active_action: Option<String>,

    #[arg(long = "schedule-action", value_name = "NAME")]
    pub schedule_action: Option<String>,

    #[arg(long = "auto-return", value_name = "true|false", num_args = 0..=1, default_missing_value = "true")]
    pub auto_return: Option<String>,

    #[arg(long = "get-icon")]
    pub get_icon: bool,

    #[arg(long = "get-action", value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    pub get_action: Option<String>,

    #[arg(long = "start-service")]
    pub start_service: bool,

    #[arg(long = "stop-service")]
    pub stop_service: bool,

    #[arg(long = "restart-service")]
    pub restart_service: bool,

    #[arg(long = "install-service")]
    pub install_service: bool,

    #[arg(long = "uninstall-service")]
    pub uninstall_service: bool,

    #[arg(long = "service-status")]
    pub service_status: bool,

    #[arg(long)]
    pub quit: bool,
}

/// One relayable command: the socket `command` name plus its `arguments`.
pub struct RelayCommand {
    pub command: String,
    pub arguments: Option<Value>,
}

impl Cli {
    /// Returns `None` when this invocation should become the daemon (no
    /// flag implying a one-shot client command was passed).
    pub fn relay_command(&self) -> Option<RelayCommand> {
        macro_rules! cmd {
            ($name:expr) => {
                Some(RelayCommand { command: $name.to_owned(), arguments: None })
            };
            ($name:expr, $args:expr) => {
                Some(RelayCommand { command: $name.to_owned(), arguments: Some($args) })
            };
        }

        if self.reload {
            return cmd!("reloadConfig");
        }
        if self.status {
            return cmd!("status");
        }
        if self.list_actions {
            return cmd!("listActions");
        }
        if let Some(name) = &self.add_insert {
            return cmd!("addInsert", json!({"name": name}));
        }
        if let Some(name) = &self.add_url {
            return cmd!("addUrl", json!({"name": name}));
        }
        if let Some(name) = &self.add_shortcut {
            return cmd!("addShortcut", json!({"name": name}));
        }
        if let Some(name) = &self.add_shell {
            return cmd!("addShell", json!({"name": name}));
        }
        if let Some(name) = &self.add_applescript {
            return cmd!("addAppleScript", json!({"name": name}));
        }
        if let Some(name) = &self.remove_action {
            return cmd!("removeAction", json!({"name": name}));
        }
        if let Some(name) = &self.exec_action {
            return cmd!("execAction", json!({"name": name}));
        }
        if let Some(name) = &self.set_active_action {
            return cmd!("updateConfig", json!({"activeAction": name}));
        }
        if let Some(name) = &self.schedule_action {
            return cmd!("scheduleAction", json!({"name": name}));
        }
        if let Some(flag) = &self.auto_return {
            let enable = !matches!(flag.to_ascii_lowercase().as_str(), "false" | "0" | "no");
            return cmd!("autoReturn", json!({"enable": enable}));
        }
        if self.get_icon {
            return cmd!("getIcon");
        }
        if let Some(name) = &self.get_action {
            return if name.is_empty() {
                cmd!("getAction")
            } else {
                cmd!("getAction", json!({"name": name}))
            };
        }
        if self.start_service {
            return cmd!("serviceStart");
        }
        if self.stop_service {
            return cmd!("serviceStop");
        }
        if self.restart_service {
            return cmd!("serviceRestart");
        }
        if self.install_service {
            return cmd!("serviceInstall");
        }
        if self.uninstall_service {
            return cmd!("serviceUninstall");
        }
        if self.service_status {
            return cmd!("serviceStatus");
        }
        if self.quit {
            return cmd!("quit");
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_become_the_daemon() {
        let cli = Cli::default();
        assert!(cli.relay_command().is_none());
    }

    #[test]
    fn action_flag_relays_as_update_config() {
        let cli = Cli {
            set_active_action: Some("pasteChat".to_owned()),
            ..Default::default()
        };
        let relay = cli.relay_command().expect("relay");
        assert_eq!(relay.command, "updateConfig");
        assert_eq!(relay.arguments, Some(json!({"activeAction": "pasteChat"})));
    }

    #[test]
    fn auto_return_false_disarms() {
        let cli = Cli {
            auto_return: Some("false".to_owned()),
            ..Default::default()
        };
        let relay = cli.relay_command().expect("relay");
        assert_eq!(relay.arguments, Some(json!({"enable": false})));
    }

    #[test]
    fn get_action_without_name_omits_arguments() {
        let cli = Cli {
            get_action: Some(String::new()),
            ..Default::default()
        };
        let relay = cli.relay_command().expect("relay");
        assert!(relay.arguments.is_none());
    }
}
