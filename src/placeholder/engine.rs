use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::action::ActionKind;
use crate::error::AppResult;
use crate::placeholder::date::render_date;
use crate::placeholder::escape::escape_for;

/// Everything the placeholder engine needs to know about one result event,
/// independent of which action is being expanded for (spec.md §4.E).
pub struct PlaceholderContext<'a> {
    pub meta: &'a Value,
    pub front_app: &'a str,
    pub action_kind: ActionKind,
    /// Overrides the `result` field when a voice trigger stripped a prefix
    /// (spec.md §4.F); `None` leaves `meta["result"]` untouched.
    pub stripped_result: Option<&'a str>,
}

/// Expands `template` against `ctx`, applying the per-action-type escape
/// table to each substituted value and, for Insert actions only, converting
/// literal `\n` two-character sequences to real newlines as a final pass.
pub fn expand_template(template: &str, ctx: &PlaceholderContext<'_>) -> AppResult<String> {
    let mut result_text = ctx
        .stripped_result
        .map(str::to_owned)
        .unwrap_or_else(|| string_of(ctx.meta.get("result")));
    let llm_result = string_of(ctx.meta.get("llmResult"));
    let mut sw_result_text = if llm_result.trim().is_empty() {
        result_text.clone()
    } else {
        llm_result
    };

    let xml_values = extract_xml_tags(template, &mut result_text, &mut sw_result_text)?;

    let token_re = token_regex();
    let mut output = String::with_capacity(template.len());
    let mut last_end = 0;

    for capture in token_re.captures_iter(template) {
        let whole = capture.get(0).expect("full match");
        output.push_str(&template[last_end..whole.start()]);
        let expr = capture.get(1).expect("inner group").as_str().trim();
        let raw_value = resolve_expression(expr, ctx, &result_text, &sw_result_text, &xml_values)?;
        output.push_str(&escape_for(ctx.action_kind, &raw_value));
        last_end = whole.end();
    }
    output.push_str(&template[last_end..]);

    if ctx.action_kind == ActionKind::Insert {
        output = output.replace("\\n", "\n");
    }

    Ok(output)
}

fn token_regex() -> Regex {
    RegexBuilder::new(r"\{\{(.*?)\}\}")
        .dot_matches_new_line(true)
        .build()
        .expect("static placeholder token pattern is valid")
}

fn resolve_expression(
    expr: &str,
    ctx: &PlaceholderContext<'_>,
    result_text: &str,
    sw_result_text: &str,
    xml_values: &HashMap<String, String>,
) -> AppResult<String> {
    if let Some((key_expr, regex_src, replacement)) = split_post_process(expr) {
        let base = resolve_key(key_expr.trim(), ctx, result_text, sw_result_text, xml_values)?;
        let pattern = Regex::new(regex_src.trim())?;
        return Ok(pattern.replace_all(&base, replacement.as_str()).into_owned());
    }

    resolve_key(expr, ctx, result_text, sw_result_text, xml_values)
}

/// Splits `key||regex||replacement`; returns `None` if `expr` has no `||`.
fn split_post_process(expr: &str) -> Option<(&str, &str, String)> {
    let mut parts = expr.splitn(3, "||");
    let key = parts.next()?;
    let regex_src = parts.next()?;
    let replacement = parts.next()?.to_owned();
    Some((key, regex_src, replacement))
}

fn resolve_key(
    key: &str,
    ctx: &PlaceholderContext<'_>,
    result_text: &str,
    sw_result_text: &str,
    xml_values: &HashMap<String, String>,
) -> AppResult<String> {
    if let Some(tag) = key.strip_prefix("xml:") {
        return Ok(xml_values.get(tag).cloned().unwrap_or_default());
    }

    match key {
        "result" => Ok(result_text.to_owned()),
        "swResult" => Ok(sw_result_text.to_owned()),
        "frontApp" => Ok(ctx.front_app.to_owned()),
        "date" => Ok(render_date(None)),
        _ if key.starts_with("date:") => Ok(render_date(Some(&key["date:".len()..]))),
        _ => Ok(string_of(ctx.meta.get(key))),
    }
}

/// Scans `template` for `{{xml:TAG}}` tokens; for each distinct tag, strips
/// the first `<TAG>...</TAG>` occurrence out of both `result` and
/// `sw_result` payloads (spec.md §4.E) and records the extracted inner text.
fn extract_xml_tags(
    template: &str,
    result_text: &mut String,
    sw_result_text: &mut String,
) -> AppResult<HashMap<String, String>> {
    let tag_re = Regex::new(r"\{\{xml:([A-Za-z0-9_-]+)\}\}")?;
    let mut values = HashMap::new();

    for capture in tag_re.captures_iter(template) {
        let tag = capture.get(1).expect("tag group").as_str();
        if values.contains_key(tag) {
            continue;
        }

        let (stripped_result, from_result) = strip_first_tag(result_text, tag)?;
        *result_text = stripped_result;
        let (stripped_sw, from_sw) = strip_first_tag(sw_result_text, tag)?;
        *sw_result_text = stripped_sw;

        values.insert(tag.to_owned(), from_result.or(from_sw).unwrap_or_default());
    }

    Ok(values)
}

fn strip_first_tag(text: &str, tag: &str) -> AppResult<(String, Option<String>)> {
    let pattern = format!(r"(?s)<{tag}>(.*?)</{tag}>", tag = regex::escape(tag));
    let re = Regex::new(&pattern)?;

    if let Some(captures) = re.captures(text) {
        let whole = captures.get(0).expect("full match");
        let inner = captures.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default();
        let stripped = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
        Ok((stripped, Some(inner)))
    } else {
        Ok((text.to_owned(), None))
    }
}

/// Stringifies a JSON value per spec.md §4.E's conversion table.
fn string_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(meta: &Value) -> PlaceholderContext<'_> {
        PlaceholderContext {
            meta,
            front_app: "Safari",
            action_kind: ActionKind::Insert,
            stripped_result: None,
        }
    }

    #[test]
    fn substitutes_result_and_converts_escaped_newlines() {
        let meta = json!({"duration": 2.3, "result": "hello"});
        let expanded = expand_template("line1\\nline2 {{result}}", &ctx(&meta)).expect("expand");
        assert_eq!(expanded, "line1\nline2 hello");
    }

    #[test]
    fn sw_result_prefers_llm_result_when_present() {
        let meta = json!({"result": "raw", "llmResult": "processed"});
        let expanded = expand_template("{{swResult}}", &ctx(&meta)).expect("expand");
        assert_eq!(expanded, "processed");
    }

    #[test]
    fn xml_tag_is_extracted_and_removed_from_payload() {
        let meta = json!({"result": "hello", "llmResult": "<thought>ignore</thought>bye"});
        let expanded = expand_template(
            "{{xml:thought}}|{{swResult}}",
            &ctx(&meta),
        )
        .expect("expand");
        assert_eq!(expanded, "ignore|bye");
    }

    #[test]
    fn untouched_when_template_has_no_xml_reference() {
        let meta = json!({"result": "hello", "llmResult": "<thought>ignore</thought>bye"});
        let expanded = expand_template("{{swResult}}", &ctx(&meta)).expect("expand");
        assert_eq!(expanded, "<thought>ignore</thought>bye");
    }

    #[test]
    fn url_action_percent_encodes_substituted_value() {
        let meta = json!({"result": "where is the moon"});
        let mut context = ctx(&meta);
        context.action_kind = ActionKind::Url;
        let expanded =
            expand_template("https://www.google.com/search?q={{result}}", &context).expect("expand");
        assert_eq!(
            expanded,
            "https://www.google.com/search?q=where%20is%20the%20moon"
        );
    }

    #[test]
    fn stripped_result_override_takes_priority_over_meta() {
        let meta = json!({"result": "ask google where is the moon"});
        let mut context = ctx(&meta);
        context.stripped_result = Some("Where is the moon");
        let expanded = expand_template("{{result}}", &context).expect("expand");
        assert_eq!(expanded, "Where is the moon");
    }

    #[test]
    fn post_process_regex_replace_applies_to_resolved_value() {
        let meta = json!({"result": "hello world"});
        let expanded = expand_template("{{result||world||there}}", &ctx(&meta)).expect("expand");
        assert_eq!(expanded, "hello there");
    }
}
