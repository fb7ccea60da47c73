use chrono::Local;

/// Renders `{{date}}`/`{{date:fmt}}` per spec.md §4.E.
///
/// `fmt` of `"short"`/`"long"` use fixed short/long forms (locale-aware
/// formatting is out of this crate's dependency stack; these are a
/// reasonable fixed substitute, recorded as an Open Question resolution).
/// A letters-only `fmt` is treated as an ICU-style skeleton (`"yMMMd"`) and
/// translated to the nearest `strftime` pattern; anything else is used
/// directly as a literal `strftime` pattern.
pub fn render_date(fmt: Option<&str>) -> String {
    let now = Local::now();
    match fmt {
        None => now.format("%Y-%m-%d").to_string(),
        Some("short") => now.format("%-m/%-d/%y").to_string(),
        Some("long") => now.format("%B %-d, %Y").to_string(),
        // Both the letters-only "template" form (`yMMMd`) and the
        // punctuated "literal pattern" form (`yyyy-MM-dd`) go through the
        // same token translator; literal separators pass through verbatim.
        Some(fmt) => now.format(&translate_skeleton(fmt)).to_string(),
    }
}

/// Translates a small, common subset of ICU date-skeleton tokens to
/// `strftime` directives. Unrecognized runs of letters pass through
/// unchanged (best-effort, not a full ICU implementation).
fn translate_skeleton(skeleton: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("y", "%Y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("dd", "%d"),
        ("d", "%-d"),
        ("EEEE", "%A"),
        ("EEE", "%a"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut output = String::new();
    let mut remaining = skeleton;
    'outer: while !remaining.is_empty() {
        for (token, directive) in TOKENS {
            if remaining.starts_with(token) {
                output.push_str(directive);
                remaining = &remaining[token.len()..];
                continue 'outer;
            }
        }
        let mut chars = remaining.chars();
        if let Some(c) = chars.next() {
            output.push(c);
        }
        remaining = chars.as_str();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_translates_common_tokens() {
        assert_eq!(translate_skeleton("yMMMd"), "%Y%b%-d");
        assert_eq!(translate_skeleton("yyyy-MM-dd"), "%Y-%m-%d");
    }

    #[test]
    fn literal_pattern_with_percent_is_used_directly() {
        let rendered = render_date(Some("%Y"));
        assert_eq!(rendered.len(), 4);
    }
}
