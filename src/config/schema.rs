use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel insert text meaning "do nothing".
pub const INSERT_NONE: &str = ".none";
/// Sentinel insert text meaning "paste the raw result, untouched".
pub const INSERT_AUTO_PASTE: &str = ".autoPaste";
/// `moveTo` sentinel meaning "delete the recording folder".
pub const MOVE_TO_DELETE: &str = ".delete";
/// `moveTo` sentinel meaning "leave the recording folder where it is".
pub const MOVE_TO_NONE: &str = ".none";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerLogic {
    And,
    Or,
}

impl Default for TriggerLogic {
    fn default() -> Self {
        TriggerLogic::And
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default)]
    pub watch: String,
    #[serde(default)]
    pub active_action: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub move_to: String,
    #[serde(default)]
    pub no_esc: bool,
    #[serde(default)]
    pub sim_keypress: bool,
    #[serde(default = "default_action_delay")]
    pub action_delay: f64,
    #[serde(default = "default_return_delay")]
    pub return_delay: f64,
    #[serde(default)]
    pub press_return: bool,
    #[serde(default = "default_true")]
    pub restore_clipboard: bool,
    #[serde(default)]
    pub clipboard_stacking: bool,
    #[serde(default)]
    pub history: Option<u32>,
    #[serde(default)]
    pub no_updates: bool,
    #[serde(default)]
    pub no_noti: bool,
}

fn default_action_delay() -> f64 {
    0.0
}

fn default_return_delay() -> f64 {
    0.0
}

fn default_true() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            watch: String::new(),
            active_action: String::new(),
            icon: None,
            move_to: String::new(),
            no_esc: false,
            sim_keypress: false,
            action_delay: default_action_delay(),
            return_delay: default_return_delay(),
            press_return: false,
            restore_clipboard: default_true(),
            clipboard_stacking: false,
            history: None,
            no_updates: false,
            no_noti: false,
        }
    }
}

/// Fields shared by every action kind, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommon {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub action_delay: Option<f64>,
    #[serde(default)]
    pub no_esc: Option<bool>,
    #[serde(default)]
    pub press_return: Option<bool>,
    #[serde(default)]
    pub sim_keypress: Option<bool>,
    #[serde(default)]
    pub restore_clipboard: Option<bool>,
    #[serde(default)]
    pub move_to: Option<String>,
    #[serde(default)]
    pub trigger_voice: String,
    #[serde(default)]
    pub trigger_apps: String,
    #[serde(default)]
    pub trigger_modes: String,
    #[serde(default)]
    pub trigger_logic: TriggerLogic,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InsertAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UrlAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(default)]
    pub open_with: Option<String>,
    #[serde(default)]
    pub open_background: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShellAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppleScriptAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MacrowhisperConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub inserts: BTreeMap<String, InsertAction>,
    #[serde(default)]
    pub urls: BTreeMap<String, UrlAction>,
    #[serde(default)]
    pub shortcuts: BTreeMap<String, ShortcutAction>,
    #[serde(default, rename = "scriptsShell")]
    pub scripts_shell: BTreeMap<String, ShellAction>,
    #[serde(default, rename = "scriptsAS")]
    pub scripts_as: BTreeMap<String, AppleScriptAction>,
}
