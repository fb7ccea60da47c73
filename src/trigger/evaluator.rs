use regex::{Regex, RegexBuilder};

use crate::config::schema::{ActionCommon, TriggerLogic};
use crate::error::AppResult;

/// One trigger field (`triggerVoice`/`triggerApps`/`triggerModes`), compiled
/// once per config load per spec.md §4.F.
#[derive(Debug, Clone)]
pub struct CompiledField {
    positive: Vec<Regex>,
    negative: Vec<Regex>,
    empty: bool,
}

impl CompiledField {
    fn compile(raw: &str, anchor_start: bool) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                positive: Vec::new(),
                negative: Vec::new(),
                empty: true,
            });
        }

        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for part in trimmed.split('|') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some(pattern) = part.strip_prefix('!') {
                negative.push(compile_ci(pattern, false)?);
            } else {
                positive.push(compile_ci(part, anchor_start)?);
            }
        }

        Ok(Self {
            positive,
            negative,
            empty: false,
        })
    }

    /// `Some(bool)` when this field participates in the match; `None` when
    /// it is neutral (unset).
    fn matches(&self, candidates: &[&str]) -> Option<bool> {
        if self.empty {
            return None;
        }

        let positive_ok = self.positive.is_empty()
            || self
                .positive
                .iter()
                .any(|pattern| candidates.iter().any(|text| pattern.is_match(text)));
        let negative_hit = self
            .negative
            .iter()
            .any(|pattern| candidates.iter().any(|text| pattern.is_match(text)));

        Some(positive_ok && !negative_hit)
    }

    /// For the voice field only: find the first positive pattern that
    /// matches at the start of `payload`, returning the matched range.
    fn leading_match(&self, payload: &str) -> Option<(usize, usize)> {
        self.positive
            .iter()
            .find_map(|pattern| pattern.find(payload).filter(|m| m.start() == 0))
            .map(|m| (m.start(), m.end()))
    }
}

fn compile_ci(pattern: &str, anchor_start: bool) -> AppResult<Regex> {
    let source = if anchor_start {
        format!("^(?:{pattern})")
    } else {
        pattern.to_owned()
    };
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct CompiledTrigger {
    voice: CompiledField,
    apps: CompiledField,
    modes: CompiledField,
    logic: TriggerLogic,
    pub has_any_field: bool,
}

pub fn compile_trigger(common: &ActionCommon) -> AppResult<CompiledTrigger> {
    let voice = CompiledField::compile(&common.trigger_voice, true)?;
    let apps = CompiledField::compile(&common.trigger_apps, false)?;
    let modes = CompiledField::compile(&common.trigger_modes, false)?;
    let has_any_field = !voice.empty || !apps.empty || !modes.empty;

    Ok(CompiledTrigger {
        voice,
        apps,
        modes,
        logic: common.trigger_logic.clone(),
        has_any_field,
    })
}

pub struct TriggerContext<'a> {
    pub app_name: &'a str,
    pub app_bundle_id: &'a str,
    pub mode: &'a str,
}

#[derive(Debug, Clone)]
pub struct TriggerEvalResult {
    pub matched: bool,
    /// Present when the voice field matched and stripped a prefix; the
    /// remainder (with the next character uppercased) replaces the payload
    /// for this action's placeholder expansion.
    pub stripped_payload: Option<String>,
}

pub fn evaluate(
    trigger: &CompiledTrigger,
    payload: &str,
    ctx: &TriggerContext<'_>,
) -> TriggerEvalResult {
    let voice_result = trigger.voice.matches(&[payload]);
    let apps_result = trigger.apps.matches(&[ctx.app_name, ctx.app_bundle_id]);
    let modes_result = trigger.modes.matches(&[ctx.mode]);

    let matched = match trigger.logic {
        TriggerLogic::And => [voice_result, apps_result, modes_result]
            .into_iter()
            .all(|field| field.unwrap_or(true)),
        TriggerLogic::Or => [voice_result, apps_result, modes_result]
            .into_iter()
            .any(|field| field.unwrap_or(false)),
    };

    let stripped_payload = if matched && voice_result == Some(true) {
        trigger.voice.leading_match(payload).map(|(_, end)| {
            let rest = payload[end..].trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
            uppercase_first(rest)
        })
    } else {
        None
    };

    TriggerEvalResult {
        matched,
        stripped_payload,
    }
}

fn uppercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ActionCommon;

    fn context<'a>() -> TriggerContext<'a> {
        TriggerContext {
            app_name: "Safari",
            app_bundle_id: "com.apple.Safari",
            mode: "default",
        }
    }

    #[test]
    fn voice_prefix_strips_and_uppercases_next_char() {
        let common = ActionCommon {
            trigger_voice: "ask google".to_owned(),
            ..Default::default()
        };
        let trigger = compile_trigger(&common).expect("compile");
        let result = evaluate(&trigger, "ask google where is the moon", &context());
        assert!(result.matched);
        assert_eq!(result.stripped_payload.as_deref(), Some("Where is the moon"));
    }

    #[test]
    fn negated_pattern_blocks_match() {
        let common = ActionCommon {
            trigger_apps: "!Safari".to_owned(),
            ..Default::default()
        };
        let trigger = compile_trigger(&common).expect("compile");
        let result = evaluate(&trigger, "hello", &context());
        assert!(!result.matched);
    }

    #[test]
    fn empty_fields_are_neutral_under_and() {
        let common = ActionCommon::default();
        let trigger = compile_trigger(&common).expect("compile");
        let result = evaluate(&trigger, "anything", &context());
        assert!(result.matched);
    }

    #[test]
    fn or_logic_requires_a_non_empty_field_to_match() {
        let common = ActionCommon {
            trigger_apps: "Mail".to_owned(),
            trigger_logic: TriggerLogic::Or,
            ..Default::default()
        };
        let trigger = compile_trigger(&common).expect("compile");
        let result = evaluate(&trigger, "anything", &context());
        assert!(!result.matched);
    }

    #[test]
    fn or_logic_matches_when_any_field_hits() {
        let common = ActionCommon {
            trigger_apps: "Safari".to_owned(),
            trigger_modes: "never-matches-mode".to_owned(),
            trigger_logic: TriggerLogic::Or,
            ..Default::default()
        };
        let trigger = compile_trigger(&common).expect("compile");
        let result = evaluate(&trigger, "anything", &context());
        assert!(result.matched);
    }
}
