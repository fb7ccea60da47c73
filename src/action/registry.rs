use std::collections::BTreeMap;

use crate::config::schema::{ActionCommon, MacrowhisperConfig};
use crate::error::{AppError, AppResult};
use crate::trigger::{compile_trigger, CompiledTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Insert,
    Url,
    Shortcut,
    ShellScript,
    AppleScript,
}

/// A flattened, trigger-compiled view of one action, independent of which
/// of the five config maps it came from.
#[derive(Debug, Clone)]
pub struct ActionRef {
    pub kind: ActionKind,
    pub name: String,
    pub common: ActionCommon,
    pub open_with: Option<String>,
    pub open_background: bool,
    pub trigger: CompiledTrigger,
}

/// Built fresh from a `MacrowhisperConfig` on every load/reload (spec.md
/// §4.F: "compile once per config load"), enforcing the disjoint-namespace
/// invariant across `inserts`/`urls`/`shortcuts`/`scriptsShell`/`scriptsAS`.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<String, ActionRef>,
}

impl ActionRegistry {
    pub fn build(config: &MacrowhisperConfig) -> AppResult<Self> {
        let mut entries: BTreeMap<String, ActionRef> = BTreeMap::new();

        macro_rules! admit {
            ($map:expr, $kind:expr) => {
                for (name, action) in $map.iter() {
                    if entries.contains_key(name) {
                        return Err(AppError::DuplicateAction(name.clone()));
                    }
                    entries.insert(
                        name.clone(),
                        ActionRef {
                            kind: $kind,
                            name: name.clone(),
                            common: action.common.clone(),
                            open_with: None,
                            open_background: false,
                            trigger: compile_trigger(&action.common)?,
                        },
                    );
                }
            };
        }

        admit!(config.inserts, ActionKind::Insert);
        for (name, action) in config.urls.iter() {
            if entries.contains_key(name) {
                return Err(AppError::DuplicateAction(name.clone()));
            }
            entries.insert(
                name.clone(),
                ActionRef {
                    kind: ActionKind::Url,
                    name: name.clone(),
                    common: action.common.clone(),
                    open_with: action.open_with.clone(),
                    open_background: action.open_background,
                    trigger: compile_trigger(&action.common)?,
                },
            );
        }
        admit!(config.shortcuts, ActionKind::Shortcut);
        admit!(config.scripts_shell, ActionKind::ShellScript);
        admit!(config.scripts_as, ActionKind::AppleScript);

        if let Some(active) = non_empty(&config.defaults.active_action) {
            if !entries.contains_key(active) {
                return Err(AppError::Config(format!(
                    "activeAction `{active}` does not name an existing action"
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&ActionRef> {
        self.entries.get(name)
    }

    pub fn name_is_free(&self, name: &str) -> bool {
        !self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRef> {
        self.entries.values()
    }

    pub fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionRef> {
        self.entries.values().filter(move |entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{InsertAction, UrlAction};

    #[test]
    fn duplicate_name_across_maps_is_rejected() {
        let mut config = MacrowhisperConfig::default();
        config.inserts.insert("shared".to_owned(), InsertAction::default());
        config.urls.insert("shared".to_owned(), UrlAction::default());

        let error = ActionRegistry::build(&config).expect_err("duplicate");
        assert!(matches!(error, AppError::DuplicateAction(name) if name == "shared"));
    }

    #[test]
    fn active_action_must_reference_an_existing_entry() {
        let mut config = MacrowhisperConfig::default();
        config.defaults.active_action = "missing".to_owned();

        let error = ActionRegistry::build(&config).expect_err("missing active action");
        assert!(matches!(error, AppError::Config(_)));
    }

    #[test]
    fn registry_exposes_entries_by_kind() {
        let mut config = MacrowhisperConfig::default();
        config.inserts.insert("pasteChat".to_owned(), InsertAction::default());
        config.urls.insert("Google".to_owned(), UrlAction::default());

        let registry = ActionRegistry::build(&config).expect("build");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.of_kind(ActionKind::Insert).count(), 1);
        assert!(registry.get("Google").is_some());
        assert!(!registry.name_is_free("Google"));
    }
}
