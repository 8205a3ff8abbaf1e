//! Free-text canonicalization for duplicate comparison.
//!
//! [`normalize`] is pure and idempotent: applying it twice yields the same
//! string as applying it once.

use std::sync::LazyLock;

use regex::Regex;

/// Hyphen, non-breaking hyphen, figure/en/em dashes, horizontal bar, minus,
/// and the Hebrew maqaf.
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\-\u{2010}-\u{2015}\u{2212}\u{05BE}]").expect("valid regex")
});

/// ASCII quotes, backtick, typographic quotes, and Hebrew geresh/gershayim.
static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'`\u{2018}\u{2019}\u{201A}\u{201B}\u{201C}\u{201D}\u{201E}\u{05F3}\u{05F4}]"#)
        .expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Legal-entity suffix tokens removed during normalization (already lowercased
/// and quote-stripped, so `בע"מ` appears as `בעמ`).
pub const LEGAL_SUFFIXES: &[&str] = &[
    "ltd",
    "limited",
    "inc",
    "incorporated",
    "llc",
    "corp",
    "plc",
    "gmbh",
    "בעמ",
];

/// Canonicalize `text` for comparison.
///
/// Trims, lowercases, turns dashes into spaces, strips quotes, collapses
/// whitespace, and drops legal-entity suffix tokens (with an optional
/// trailing `.` or `,`).
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let dashless = DASH_RE.replace_all(&lowered, " ");
    let unquoted = QUOTE_RE.replace_all(&dashless, "");
    let collapsed = WHITESPACE_RE.replace_all(&unquoted, " ");

    collapsed
        .split(' ')
        .filter(|token| !token.is_empty() && !is_legal_suffix(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_legal_suffix(token: &str) -> bool {
    let bare = token.trim_end_matches(['.', ',']);
    LEGAL_SUFFIXES.contains(&bare)
}

/// Keep only ASCII digits, e.g. for phone comparison.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Comparison key for an email address: trimmed and Unicode-lowercased.
///
/// Unlike [`normalize`], dashes, quotes and suffix-like tokens are kept
/// since they are significant in addresses.
pub fn email_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Reduce a phone number to its national digit form.
///
/// Strips formatting, drops a `00` international prefix, and rewrites a
/// leading `country_code` as the national trunk prefix `0`, so that
/// `+972-50-1234567` and `050-1234567` compare equal.
pub fn canonical_phone(text: &str, country_code: &str) -> String {
    let digits = digits_only(text);
    let digits = digits.strip_prefix("00").unwrap_or(&digits);
    match digits.strip_prefix(country_code) {
        Some(national) if !country_code.is_empty() && !national.is_empty() => {
            let national = national.strip_prefix('0').unwrap_or(national);
            format!("0{national}")
        }
        _ => digits.to_string(),
    }
}
