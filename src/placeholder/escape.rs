use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::action::ActionKind;

/// `[A-Za-z0-9\-._~]` is left unescaped; everything else is percent-encoded.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Per-action-type escaping table, spec.md §4.E. Applied only to a
/// substituted placeholder value, never to the surrounding template text.
pub fn escape_for(kind: ActionKind, value: &str) -> String {
    match kind {
        ActionKind::Insert => value.to_owned(),
        ActionKind::Url => percent_encoding::utf8_percent_encode(value, URL_SAFE).to_string(),
        ActionKind::ShellScript => escape_shell(value),
        ActionKind::AppleScript => escape_applescript(value),
        ActionKind::Shortcut => value.to_owned(),
    }
}

fn escape_shell(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '"' | '`' | '$') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn escape_applescript(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '"') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
