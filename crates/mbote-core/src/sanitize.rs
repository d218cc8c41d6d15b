//! Outbound-text sanitization.
//!
//! Every message must pass through here before it reaches the provider
//! send API — unsanitized markup has caused provider-side rejections.
//! Cleaning order: strip tags (terminated or not), strip stray angle
//! brackets, decode the named entity table, drop numeric entities,
//! collapse whitespace, then enforce the 4096-character transport cap.

use crate::error::MboteError;

/// Hard cap WhatsApp places on a text message body.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const ELLIPSIS: &str = "...";

/// Named entities decoded after markup stripping.
const ENTITIES: [(&str, &str); 9] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&copy;", "\u{a9}"),
    ("&reg;", "\u{ae}"),
    ("&trade;", "\u{2122}"),
];

/// Clean free text for transport and storage.
///
/// Fails with [`MboteError::EmptyContent`] when nothing survives cleaning.
pub fn sanitize(raw: &str) -> Result<String, MboteError> {
    let text = strip_markup(raw);
    let text = decode_entities(&text);
    let text = collapse_whitespace(&text);

    if text.is_empty() {
        return Err(MboteError::EmptyContent);
    }

    Ok(truncate_for_transport(&text))
}

/// Remove `<...>` tags, including malformed/unterminated ones, then any
/// stray angle brackets left behind.
pub fn strip_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;

    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    // An unterminated tag swallows the rest of the input by design: a
    // dangling "<" is markup, not content.
    out
}

fn decode_entities(text: &str) -> String {
    let mut out = text.to_string();
    for (entity, replacement) in &ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    strip_numeric_entities(&out)
}

/// Drop generic `&#123;` / `&#x1f600;` entity syntax.
fn strip_numeric_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("&#") {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);

        let body = &tail[2..];
        let body = body.strip_prefix(['x', 'X']).unwrap_or(body);
        let digits = body.chars().take_while(|c| c.is_ascii_hexdigit()).count();
        let semi = body[..].chars().nth(digits) == Some(';');

        if digits > 0 && semi {
            let hex_marker = if tail[2..].starts_with(['x', 'X']) { 1 } else { 0 };
            rest = &tail[2 + hex_marker + digits + 1..];
        } else {
            // Not entity syntax — keep the literal "&#" and move on.
            out.push_str("&#");
            rest = &tail[2..];
        }
    }
    out.push_str(rest);
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Enforce the provider's message cap: over-long text is cut to 4093
/// characters with an ellipsis marker appended.
pub fn truncate_for_transport(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_MESSAGE_CHARS - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(sanitize("Bonjour tout le monde").unwrap(), "Bonjour tout le monde");
    }

    #[test]
    fn test_tags_and_amp_entity() {
        assert_eq!(
            sanitize("<b>Hello</b> &amp; welcome").unwrap(),
            "Hello & welcome"
        );
    }

    #[test]
    fn test_unterminated_tag_swallows_tail() {
        assert_eq!(sanitize("hello <b broken").unwrap(), "hello");
    }

    #[test]
    fn test_stray_closing_bracket_dropped() {
        assert_eq!(sanitize("a > b").unwrap(), "a b");
    }

    #[test]
    fn test_entity_table() {
        assert_eq!(
            sanitize("&quot;ok&quot; &#39;yes&#39;&nbsp;&copy;&reg;&trade;").unwrap(),
            "\"ok\" 'yes' \u{a9}\u{ae}\u{2122}"
        );
    }

    #[test]
    fn test_numeric_entities_removed() {
        assert_eq!(sanitize("a&#128512;b &#x1F600; c").unwrap(), "ab c");
    }

    #[test]
    fn test_bare_ampersand_hash_kept() {
        assert_eq!(sanitize("tarif &# 5").unwrap(), "tarif &# 5");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(sanitize("  a \n\t b   c  ").unwrap(), "a b c");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(sanitize(""), Err(MboteError::EmptyContent)));
    }

    #[test]
    fn test_markup_only_input_rejected() {
        assert!(matches!(
            sanitize("<div><span></span></div>"),
            Err(MboteError::EmptyContent)
        ));
    }

    #[test]
    fn test_long_text_truncated_with_marker() {
        let long = "a".repeat(5000);
        let out = sanitize(&long).unwrap();
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().filter(|c| *c == 'a').count(), 4093);
    }

    #[test]
    fn test_exactly_at_cap_untouched() {
        let text = "b".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(sanitize(&text).unwrap(), text);
    }

    #[test]
    fn test_strip_markup_helper() {
        assert_eq!(strip_markup("<i>x</i>y"), "xy");
    }
}
