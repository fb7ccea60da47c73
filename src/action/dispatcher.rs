use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::action::exec;
use crate::action::injector::{FrontApp, InputInjector};
use crate::action::registry::{ActionKind, ActionRef, ActionRegistry};
use crate::config::schema::{Defaults, INSERT_AUTO_PASTE, INSERT_NONE};
use crate::error::AppResult;
use crate::placeholder::{expand_template, PlaceholderContext};
use crate::trigger::{evaluate, TriggerContext};

/// Keystroke-by-keystroke typing delay for `simKeypress` inserts. Not a
/// config field in spec.md; a fixed value keeps synthesized typing visibly
/// distinct from an instantaneous paste without needing its own setting.
const KEYSTROKE_DELAY: Duration = Duration::from_millis(12);

/// The clipboard is restored after this tail delay following a paste,
/// spec.md §4.G.
const CLIPBOARD_RESTORE_TAIL: Duration = Duration::from_millis(300);

pub struct DispatchOutcome {
    pub action_executed: Option<String>,
    pub move_to: Option<String>,
}

/// Resolves and executes the action for one result event, per spec.md
/// §4.G's priority order: triggered > scheduled > auto-return > active
/// default > moveTo-only.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_result_event(
    meta: &Value,
    registry: &ActionRegistry,
    defaults: &Defaults,
    mode: &str,
    scheduled_action: Option<&str>,
    auto_return_armed: bool,
    injector: &dyn InputInjector,
) -> AppResult<DispatchOutcome> {
    let front_app = injector.front_app()?;
    let payload = string_of_result(meta);

    if let Some((entry, stripped)) = select_triggered(registry, &payload, mode, &front_app) {
        execute_action(
            entry,
            meta,
            &front_app.name,
            stripped.as_deref(),
            defaults,
            auto_return_armed,
            injector,
        )?;
        return Ok(DispatchOutcome {
            action_executed: Some(entry.name.clone()),
            move_to: Some(resolve_move_to(entry, defaults)),
        });
    }

    if let Some(name) = scheduled_action {
        if let Some(entry) = registry.get(name) {
            execute_action(entry, meta, &front_app.name, None, defaults, auto_return_armed, injector)?;
            return Ok(DispatchOutcome {
                action_executed: Some(entry.name.clone()),
                move_to: Some(resolve_move_to(entry, defaults)),
            });
        }
    }

    if auto_return_armed {
        injector.paste(&payload)?;
        thread::sleep(Duration::from_secs_f64(defaults.return_delay));
        injector.press_return()?;
        return Ok(DispatchOutcome {
            action_executed: None,
            move_to: Some(defaults.move_to.clone()),
        });
    }

    let active_name = defaults.active_action.trim();
    if !active_name.is_empty() {
        if let Some(entry) = registry.get(active_name) {
            execute_action(entry, meta, &front_app.name, None, defaults, auto_return_armed, injector)?;
            return Ok(DispatchOutcome {
                action_executed: Some(entry.name.clone()),
                move_to: Some(resolve_move_to(entry, defaults)),
            });
        }
    }

    Ok(DispatchOutcome {
        action_executed: None,
        move_to: Some(defaults.move_to.clone()),
    })
}

fn select_triggered<'a>(
    registry: &'a ActionRegistry,
    payload: &str,
    mode: &str,
    front_app: &FrontApp,
) -> Option<(&'a ActionRef, Option<String>)> {
    let ctx = TriggerContext {
        app_name: &front_app.name,
        app_bundle_id: &front_app.bundle_id,
        mode,
    };

    let mut matches: Vec<(&ActionRef, Option<String>)> = registry
        .iter()
        .filter_map(|entry| {
            let result = evaluate(&entry.trigger, payload, &ctx);
            result.matched.then_some((entry, result.stripped_payload))
        })
        .collect();

    matches.sort_by_key(|(entry, _)| entry.name.to_ascii_lowercase());
    matches.into_iter().next()
}

fn resolve_move_to(action: &ActionRef, defaults: &Defaults) -> String {
    action
        .common
        .move_to
        .clone()
        .unwrap_or_else(|| defaults.move_to.clone())
}

fn resolve_delay(action_value: Option<f64>, default_value: f64) -> f64 {
    action_value.unwrap_or(default_value)
}

fn resolve_bool(action_value: Option<bool>, default_value: bool) -> bool {
    action_value.unwrap_or(default_value)
}

fn string_of_result(meta: &Value) -> String {
    match meta.get("result") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn execute_action(
    action: &ActionRef,
    meta: &Value,
    front_app: &str,
    stripped_result: Option<&str>,
    defaults: &Defaults,
    auto_return_armed: bool,
    injector: &dyn InputInjector,
) -> AppResult<()> {
    match action.kind {
        ActionKind::Insert => {
            execute_insert(action, meta, front_app, stripped_result, defaults, auto_return_armed, injector)
        }
        ActionKind::Url => execute_url(action, meta, front_app, stripped_result),
        ActionKind::Shortcut => execute_shortcut(action, meta, front_app, stripped_result),
        ActionKind::ShellScript => execute_shell(action, meta, front_app, stripped_result),
        ActionKind::AppleScript => execute_applescript(action, meta, front_app, stripped_result),
    }
}

#[allow(clippy::too_many_arguments)]
fn execute_insert(
    action: &ActionRef,
    meta: &Value,
    front_app: &str,
    stripped_result: Option<&str>,
    defaults: &Defaults,
    auto_return_armed: bool,
    injector: &dyn InputInjector,
) -> AppResult<()> {
    let action_delay = resolve_delay(action.common.action_delay, defaults.action_delay);
    let raw_action = action.common.action.trim();

    if raw_action.is_empty() || raw_action == INSERT_NONE {
        thread::sleep(Duration::from_secs_f64(action_delay));
        return Ok(());
    }

    thread::sleep(Duration::from_secs_f64(action_delay));

    let is_auto_paste = raw_action == INSERT_AUTO_PASTE;
    let text = if is_auto_paste {
        stripped_result
            .map(str::to_owned)
            .unwrap_or_else(|| string_of_result(meta))
    } else {
        let ctx = PlaceholderContext {
            meta,
            front_app,
            action_kind: ActionKind::Insert,
            stripped_result,
        };
        expand_template(raw_action, &ctx)?
    };

    if is_auto_paste {
        let focused_is_input = injector.focused_element_is_input()?;
        let no_esc = resolve_bool(action.common.no_esc, defaults.no_esc);
        if focused_is_input && !no_esc {
            injector.press_escape()?;
        }
    }

    let sim_keypress = resolve_bool(action.common.sim_keypress, defaults.sim_keypress);
    let restore_clipboard = resolve_bool(action.common.restore_clipboard, defaults.restore_clipboard);
    perform_paste(injector, &text, sim_keypress, restore_clipboard)?;

    let press_return = resolve_bool(action.common.press_return, defaults.press_return);
    if press_return || auto_return_armed {
        let return_delay = resolve_delay(None, defaults.return_delay);
        thread::sleep(Duration::from_secs_f64(return_delay));
        injector.press_return()?;
    }

    Ok(())
}

fn perform_paste(
    injector: &dyn InputInjector,
    text: &str,
    sim_keypress: bool,
    restore_clipboard: bool,
) -> AppResult<()> {
    if sim_keypress {
        return injector.type_keystrokes(text, KEYSTROKE_DELAY);
    }

    let previous = if restore_clipboard {
        Some(injector.read_clipboard()?)
    } else {
        None
    };

    injector.paste(text)?;
    thread::sleep(CLIPBOARD_RESTORE_TAIL);

    if let Some(previous) = previous {
        injector.write_clipboard(&previous)?;
    }

    Ok(())
}

fn execute_url(action: &ActionRef, meta: &Value, front_app: &str, stripped_result: Option<&str>) -> AppResult<()> {
    let ctx = PlaceholderContext {
        meta,
        front_app,
        action_kind: ActionKind::Url,
        stripped_result,
    };
    let url = expand_template(&action.common.action, &ctx)?;
    exec::open_url(&url, action.open_with.as_deref(), action.open_background)
}

fn execute_shortcut(
    action: &ActionRef,
    meta: &Value,
    front_app: &str,
    stripped_result: Option<&str>,
) -> AppResult<()> {
    let ctx = PlaceholderContext {
        meta,
        front_app,
        action_kind: ActionKind::Shortcut,
        stripped_result,
    };
    let payload = expand_template(&action.common.action, &ctx)?;
    exec::run_shortcut(&action.name, &payload)
}

fn execute_shell(action: &ActionRef, meta: &Value, front_app: &str, stripped_result: Option<&str>) -> AppResult<()> {
    let ctx = PlaceholderContext {
        meta,
        front_app,
        action_kind: ActionKind::ShellScript,
        stripped_result,
    };
    let script = expand_template(&action.common.action, &ctx)?;
    exec::run_shell(&script)
}

fn execute_applescript(
    action: &ActionRef,
    meta: &Value,
    front_app: &str,
    stripped_result: Option<&str>,
) -> AppResult<()> {
    let ctx = PlaceholderContext {
        meta,
        front_app,
        action_kind: ActionKind::AppleScript,
        stripped_result,
    };
    let script = expand_template(&action.common.action, &ctx)?;
    exec::run_applescript(&script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::injector::NullInputInjector;
    use crate::config::schema::{ActionCommon, InsertAction, MacrowhisperConfig, UrlAction};
    use serde_json::json;

    fn registry_with_google_action() -> ActionRegistry {
        let mut config = MacrowhisperConfig::default();
        config.urls.insert(
            "Google".to_owned(),
            UrlAction {
                common: ActionCommon {
                    action: "https://www.google.com/search?q={{result}}".to_owned(),
                    trigger_voice: "ask google".to_owned(),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        ActionRegistry::build(&config).expect("build")
    }

    #[test]
    fn triggered_url_action_is_selected_and_strips_voice_prefix() {
        let registry = registry_with_google_action();
        let front_app = FrontApp::default();
        let (entry, stripped) =
            select_triggered(&registry, "ask google where is the moon", "default", &front_app)
                .expect("a match");
        assert_eq!(entry.name, "Google");
        assert_eq!(stripped.as_deref(), Some("Where is the moon"));
    }

    #[test]
    fn dispatch_falls_back_to_move_to_only_when_nothing_matches() {
        let registry = ActionRegistry::build(&MacrowhisperConfig::default()).expect("build");
        let defaults = Defaults {
            move_to: ".delete".to_owned(),
            ..Default::default()
        };
        let meta = json!({"duration": 1.0, "result": "hello"});
        let injector = NullInputInjector::new();

        let outcome =
            dispatch_result_event(&meta, &registry, &defaults, "default", None, false, &injector)
                .expect("dispatch");
        assert!(outcome.action_executed.is_none());
        assert_eq!(outcome.move_to.as_deref(), Some(".delete"));
    }

    #[test]
    fn insert_none_sentinel_is_a_no_op() {
        let mut config = MacrowhisperConfig::default();
        config.inserts.insert(
            "silent".to_owned(),
            InsertAction {
                common: ActionCommon {
                    action: ".none".to_owned(),
                    ..Default::default()
                },
            },
        );
        let registry = ActionRegistry::build(&config).expect("build");
        let defaults = Defaults {
            active_action: "silent".to_owned(),
            ..Default::default()
        };
        let meta = json!({"duration": 1.0, "result": "hello"});
        let injector = NullInputInjector::new();

        let outcome =
            dispatch_result_event(&meta, &registry, &defaults, "default", None, false, &injector)
                .expect("dispatch");
        assert_eq!(outcome.action_executed.as_deref(), Some("silent"));
        assert!(injector.read_clipboard().expect("clipboard").is_empty());
    }
}
