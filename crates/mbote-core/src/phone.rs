//! Phone number normalization to canonical international form.
//!
//! Total: every input maps to a string, never an error. Numbers that
//! still fail [`is_valid`] afterwards are dropped from send batches with
//! a warning, not treated as fatal.

/// International calling codes recognized as already-prefixed when a
/// number arrives without `+`. Sub-Saharan Africa first — that is where
/// the traffic comes from.
const CALLING_CODES: [&str; 40] = [
    "211", "220", "221", "222", "223", "224", "225", "226", "227", "228",
    "229", "230", "231", "232", "233", "234", "235", "236", "237", "238",
    "239", "240", "241", "242", "243", "244", "245", "248", "249", "250",
    "251", "252", "253", "254", "255", "256", "257", "258", "260", "261",
];

/// Normalize an arbitrary phone string to `+<country><subscriber>` form.
///
/// `default_prefix` (e.g. `"+242"`) is applied to local-format numbers:
/// a trunk `0` is dropped first, bare subscriber numbers get the prefix
/// as-is. Already-`+`-prefixed numbers are trusted and returned cleaned.
pub fn normalize(raw: &str, default_prefix: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    if cleaned.starts_with('+') {
        return cleaned;
    }

    if CALLING_CODES.iter().any(|code| cleaned.starts_with(code)) {
        return format!("+{cleaned}");
    }

    if let Some(rest) = cleaned.strip_prefix('0') {
        return format!("{default_prefix}{rest}");
    }

    format!("{default_prefix}{cleaned}")
}

/// Keep digits plus a single leading `+`.
fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_ascii_digit() || (ch == '+' && i == 0) {
            out.push(ch);
        }
    }
    out
}

/// E.164 shape check: `^\+[1-9]\d{1,14}$`.
pub fn is_valid(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    if digits.len() < 2 || digits.len() > 15 {
        return false;
    }
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9')) && chars.all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONGO: &str = "+242";

    #[test]
    fn test_already_canonical_unchanged() {
        assert_eq!(normalize("+14155552671", CONGO), "+14155552671");
        assert_eq!(normalize("+242061234567", CONGO), "+242061234567");
    }

    #[test]
    fn test_formatting_characters_stripped() {
        assert_eq!(normalize("+1 (415) 555-2671", CONGO), "+14155552671");
    }

    #[test]
    fn test_known_calling_code_gets_plus() {
        assert_eq!(normalize("242055123456", CONGO), "+242055123456");
        assert_eq!(normalize("254712345678", CONGO), "+254712345678");
    }

    #[test]
    fn test_trunk_zero_replaced_by_default_prefix() {
        assert_eq!(normalize("0551234567", CONGO), "+242551234567");
    }

    #[test]
    fn test_bare_subscriber_gets_default_prefix() {
        assert_eq!(normalize("61234567", CONGO), "+24261234567");
    }

    #[test]
    fn test_empty_and_junk_input() {
        assert_eq!(normalize("", CONGO), "");
        assert_eq!(normalize("---", CONGO), "");
    }

    #[test]
    fn test_plus_only_at_start() {
        // Interior plus signs are noise, not prefixes.
        assert_eq!(normalize("06+123", CONGO), "+2426123");
    }

    #[test]
    fn test_is_valid_accepts_e164() {
        assert!(is_valid("+242061234567"));
        assert!(is_valid("+14155552671"));
        assert!(is_valid("+49"));
    }

    #[test]
    fn test_is_valid_rejects_bad_shapes() {
        assert!(!is_valid("242061234567")); // missing +
        assert!(!is_valid("+0611111111")); // leading zero after +
        assert!(!is_valid("+1")); // too short
        assert!(!is_valid(&format!("+1{}", "2".repeat(15)))); // too long
        assert!(!is_valid("+24a0611111")); // non-digit
        assert!(!is_valid(""));
    }

    #[test]
    fn test_normalized_output_is_valid() {
        for raw in ["0551234567", "242055123456", "61234567", "+14155552671"] {
            let n = normalize(raw, CONGO);
            assert!(is_valid(&n), "normalize({raw:?}) = {n:?} should be valid");
        }
    }
}
