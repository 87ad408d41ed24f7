//! Text extractors
//!
//! Pure, total functions that pull structured signals out of raw chat text.
//! None of them fail: every input, including the empty string, has a defined result.

use regex::Regex;
use std::sync::OnceLock;

static TRACKING_NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn tracking_number_regex() -> &'static Regex {
    TRACKING_NUMBER_REGEX.get_or_init(|| {
        // ASCII classes and boundaries: letters outside ASCII never glue onto the number,
        // and `(?i)` would let the Kelvin sign stand in for `K`
        Regex::new(r"(?-u:\b)[Tt][Rr][Kk][0-9]{9}(?-u:\b)")
            .expect("Failed to compile tracking number regex")
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?x)
            (?-u:\b)
            (?:
                # dotted local part, or a quoted one
                [^<>()\[\]\\.,;:\s@"]+ (?:\.[^<>()\[\]\\.,;:\s@"]+)*
                |
                ".+"
            )
            @
            (?:
                # bracketed IPv4 literal
                \[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\]
                |
                (?:[a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}
            )
            (?-u:\b)
            "#,
        )
        .expect("Failed to compile email regex")
    })
}

/// Find the first tracking number (`TRK` + 9 digits) in `text`.
///
/// Matching is case-insensitive and bounded by word boundaries. The result is
/// normalized to uppercase so it can be used directly as a lookup key. Only the
/// first occurrence counts; later tracking numbers in the same text are ignored.
pub fn extract_tracking_number(text: &str) -> Option<String> {
    tracking_number_regex()
        .find(text)
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Find the first email address in `text`.
///
/// Returns an empty string when there is none. Callers must treat `""` as
/// "no email", never as a zero-length address.
pub fn extract_email(text: &str) -> String {
    email_regex()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Case-insensitive substring test against a keyword list.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}
