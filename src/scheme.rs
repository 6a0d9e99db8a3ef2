//! Scheme gate: the first and cheapest check.
//!
//! Runs on the raw input before any URL parsing so that input too broken to
//! parse is still refused predictably on its scheme alone.

/// Schemes accepted when no configuration overrides them.
pub const DEFAULT_SCHEMES: &[&str] = &["https:", "wss:"];

/// Extract the scheme token: everything before the first `//`.
///
/// Input without `//` yields the whole string, which will not match any
/// allowed scheme. Schema-relative input (`//host/path`) yields `""`.
pub(crate) fn scheme_token(input: &str) -> &str {
    input.split("//").next().unwrap_or_default()
}

/// Normalize a scheme for comparison: ASCII-lowercase with a trailing colon.
pub(crate) fn normalize_scheme(scheme: &str) -> String {
    let mut normalized = scheme.trim().to_ascii_lowercase();
    if !normalized.ends_with(':') {
        normalized.push(':');
    }
    normalized
}

/// Check the raw input's scheme token against the allowed set.
///
/// `allowed` entries are expected in normalized form (`"https:"`).
pub(crate) fn is_scheme_allowed<S: AsRef<str>>(input: &str, allowed: &[S]) -> bool {
    let token = scheme_token(input);
    if token.is_empty() {
        return false;
    }
    allowed
        .iter()
        .any(|scheme| token.eq_ignore_ascii_case(scheme.as_ref()))
}
