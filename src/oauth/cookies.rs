//! `Set-Cookie` → `Cookie` conversion for the hop between authorize and sign-in.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Matches the start of a new cookie (`token=`) after a folding comma.
static COOKIE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[!#$%&'*+\-.^_`|~0-9A-Za-z]+=").expect("cookie name pattern is valid")
});

/// Split a possibly comma-folded `Set-Cookie` value into individual cookies.
///
/// Only commas followed by `name=` start a new cookie, so dates such as
/// `Expires=Wed, 01-Jan-2030 00:00:00 GMT` stay intact.
pub fn split_set_cookie(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, ch) in raw.char_indices() {
        if ch == ',' && COOKIE_START.is_match(&raw[idx + 1..]) {
            parts.push(raw[start..idx].trim());
            start = idx + 1;
        }
    }
    parts.push(raw[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// The `name=value` pair of one cookie, without attributes.
fn name_value(cookie: &str) -> Option<&str> {
    let pair = cookie.split(';').next()?.trim();
    let (name, _) = pair.split_once('=')?;
    if name.trim().is_empty() {
        return None;
    }
    Some(pair)
}

/// Collect every cookie in `headers` into a single `Cookie` header value.
///
/// Returns an empty string when no cookies were set.
pub fn extract_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_set_cookie)
        .filter_map(name_value)
        .collect::<Vec<_>>()
        .join("; ")
}
