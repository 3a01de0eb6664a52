use std::sync::OnceLock;

use regex::Regex;

/// Production API endpoint, used when `OKAREO_BASE_URL` is unset or empty
pub const DEFAULT_ENDPOINT: &str = "https://api.okareo.com";

/// Environment variable overriding the API endpoint
pub const BASE_URL_VAR: &str = "OKAREO_BASE_URL";

fn indirect_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$\{(.+)\}$").expect("static pattern is valid"))
}

/// Resolve a `${VAR}` indirection against the process environment.
///
/// Values that are not of that exact form are returned unchanged. An unset
/// variable resolves to the empty string.
pub fn resolve_indirect(value: &str) -> String {
    resolve_indirect_with(value, |name| std::env::var(name).ok())
}

/// Same as [`resolve_indirect`], reading variables through `lookup`.
pub fn resolve_indirect_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match indirect_pattern().captures(value) {
        Some(caps) => lookup(&caps[1]).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Base URL of the remote API.
pub fn resolve_endpoint() -> String {
    endpoint_from(std::env::var(BASE_URL_VAR).ok())
}

fn endpoint_from(value: Option<String>) -> String {
    match value {
        Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}
