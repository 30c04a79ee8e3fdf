//! `${NAME}` / `${NAME:-default}` expansion over configuration text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("token pattern is valid"));

const DEFAULT_MARKER: &str = ":-";

/// Expands tokens against the process environment.
pub fn expand(text: &str) -> String {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expands tokens against an arbitrary lookup.
///
/// Single pass: substituted values are never rescanned. A token whose
/// variable is unset or empty and which has no default is left as-is.
pub fn expand_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let (name, default) = match body.split_once(DEFAULT_MARKER) {
                Some((name, default)) => (name, Some(default)),
                None => (body, None),
            };
            match lookup(name).filter(|v| !v.is_empty()) {
                Some(value) => value,
                None => default.map(str::to_string).unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}
