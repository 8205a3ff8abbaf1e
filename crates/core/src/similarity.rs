//! Edit-distance similarity and exact-signal matching.

use crate::normalize::{canonical_phone, email_key, normalize};

/// Similarity of two strings in `[0, 1]` after normalization.
///
/// Returns `1.0` when the normalized forms are equal. This includes two
/// strings that both normalize to empty, which is not evidence of anything:
/// callers must skip blank fields before comparing.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize(a), &normalize(b))
}

/// Similarity of two already-normalized strings.
///
/// `(max_len - levenshtein) / max_len`, measured in Unicode scalar values.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    ((max_len as f64 - distance as f64) / max_len as f64).clamp(0.0, 1.0)
}

/// Exact phone match on canonical national digits with a minimum length.
pub fn phone_match(a: &str, b: &str, min_digits: usize, country_code: &str) -> bool {
    let a = canonical_phone(a, country_code);
    let b = canonical_phone(b, country_code);
    a.len() >= min_digits && a == b
}

/// Case-insensitive exact email match. Blank values never match.
pub fn email_match(a: &str, b: &str) -> bool {
    let (a, b) = (email_key(a), email_key(b));
    !a.is_empty() && a == b
}

/// Exact business identifier match. Blank values never match.
pub fn identifier_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: &[(&str, &str)] = &[
        ("Acme Ltd", "acme"),
        ("Acme", "Acne"),
        ("Globex Corporation", "Globex Corp"),
        ("", "something"),
        ("abc", "xyz"),
        ("Dana Levi", "Dana Levy"),
        ("אלפא מערכות", "אלפא מערכת"),
    ];

    #[test]
    fn identical_after_normalization_is_one() {
        assert_eq!(similarity("Acme Ltd", "acme"), 1.0);
        assert_eq!(similarity("ACME  inc.", "Acme"), 1.0);
    }

    #[test]
    fn two_empty_strings_score_one() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("Ltd", "  "), 1.0);
    }

    #[test]
    fn one_edit_in_four_characters() {
        assert!((similarity("Acme", "Acne") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn similarity_is_bounded_and_symmetric() {
        for (a, b) in PAIRS {
            let ab = similarity(a, b);
            let ba = similarity(b, a);
            assert!((0.0..=1.0).contains(&ab), "{a:?} vs {b:?} out of range: {ab}");
            assert_eq!(ab, ba, "asymmetric for {a:?} vs {b:?}");
            assert_eq!(similarity(a, a), 1.0);
        }
    }

    #[test]
    fn completely_different_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn phone_match_ignores_formatting_and_country_code() {
        assert!(phone_match("+972-50-1234567", "0501234567", 9, "972"));
        assert!(phone_match("(03) 555-1234", "03 5551234", 9, "972"));
    }

    #[test]
    fn phone_match_rejects_short_numbers() {
        assert!(!phone_match("1234", "1234", 9, "972"));
        assert!(!phone_match("", "", 9, "972"));
    }

    #[test]
    fn phone_match_rejects_different_numbers() {
        assert!(!phone_match("0501234567", "0501234568", 9, "972"));
    }

    #[test]
    fn email_match_is_case_insensitive() {
        assert!(email_match("Dana@Example.com", "dana@example.com "));
        assert!(!email_match("dana@example.com", "dan@example.com"));
        assert!(!email_match("", ""));
        assert!(email_match("Élodie@exemple.fr", "élodie@exemple.fr"));
        assert!(!email_match("o-brien@x.com", "o brien@x.com"));
    }

    #[test]
    fn identifier_match_is_exact() {
        assert!(identifier_match("514123456", "514123456"));
        assert!(!identifier_match("514123456", "514123457"));
        assert!(!identifier_match(" ", " "));
    }
}
