//! Launch parameter decoding.
//!
//! The host hands the client a single opaque string. Accepted shapes:
//!
//! * `<chat>`: open the form for a chat,
//! * `<chat>_<report>`: deep link into one of the user's own reports,
//! * `admin_<chat>_<report>`: deep link into the admin queue.
//!
//! Group chat ids are negative and may carry embedded underscores once
//! concatenated with a report id, so a leading minus sign switches to
//! "last token is the report, everything before it is the chat".

use crate::models::launch::LaunchContext;

/// Prefix that marks an admin deep link.
pub const ADMIN_MARKER: &str = "admin_";

const DELIMITER: char = '_';

/// Resolve a launch parameter into a [`LaunchContext`].
///
/// Never fails: unparseable numeric parts resolve to `None`.
#[must_use]
pub fn resolve_launch_param(raw: Option<&str>) -> LaunchContext {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return LaunchContext::default();
    };

    let (body, admin_intent) = match raw.strip_prefix(ADMIN_MARKER) {
        Some(rest) => (rest, true),
        None => (raw, false),
    };

    let tokens: Vec<&str> = body.split(DELIMITER).collect();
    let (chat_id, report_id) = match tokens.as_slice() {
        [first, .., last] if first.starts_with('-') => {
            let chat = tokens[..tokens.len() - 1].join("_");
            (parse_leading_int(&chat), parse_leading_int(last))
        }
        [chat, report] => (parse_leading_int(chat), parse_leading_int(report)),
        _ => (parse_leading_int(body), None),
    };

    LaunchContext {
        chat_id,
        report_id,
        admin_intent,
    }
}

/// Parse the leading integer of a token.
///
/// Leading whitespace and an optional sign are accepted and parsing stops
/// at the first non-digit, so `-100_5` reads as `-100`. Tokens without
/// any leading digit, or that overflow `i64`, yield `None`.
#[must_use]
pub fn parse_leading_int(token: &str) -> Option<i64> {
    let token = token.trim_start();
    let (sign, digits) = match token.as_bytes().first() {
        Some(b'-') => ("-", &token[1..]),
        Some(b'+') => ("", &token[1..]),
        _ => ("", token),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    format!("{sign}{}", &digits[..end]).parse().ok()
}
