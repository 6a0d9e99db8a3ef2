//! URL parsing and host classification.

use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::Error;

/// What kind of host a URL names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Ipv4,
    Ipv6,
    Domain,
}

/// A parsed candidate URL, reduced to what the checks need.
///
/// Derived once per validation call and never mutated. IPv6 hostnames are
/// stored without brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    scheme: String,
    hostname: String,
    kind: HostKind,
}

impl ParsedUrl {
    /// Parse a candidate URL, failing closed on anything structurally off.
    ///
    /// Besides what [`Url::parse`] refuses, this rejects:
    /// - non-standard IPv4 spellings (octal, decimal, hexadecimal, short-form)
    /// - userinfo (`user:pass@`)
    /// - URLs without a host
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for every structural failure.
    pub fn parse(input: &str) -> Result<Self, Error> {
        // Url::parse rewrites 0177.0.0.1 and friends, so screen the raw text first
        reject_non_standard_ip_in_raw_url(input)?;

        let url = Url::parse(input).map_err(|e| Error::invalid_url(input, e.to_string()))?;

        if !url.username().is_empty() || url.password().is_some() {
            return Err(Error::invalid_url(input, "userinfo (user:pass@) not allowed"));
        }

        let (hostname, kind) = match url.host() {
            Some(Host::Ipv4(ip)) => (ip.to_string(), HostKind::Ipv4),
            Some(Host::Ipv6(ip)) => (ip.to_string(), HostKind::Ipv6),
            Some(Host::Domain(domain)) => classify_domain_host(domain, input)?,
            None => return Err(Error::invalid_url(input, "URL must have a host")),
        };

        Ok(Self {
            scheme: format!("{}:", url.scheme()),
            hostname,
            kind,
        })
    }

    /// Scheme with its trailing colon, lowercase (`"https:"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn is_ip_literal(&self) -> bool {
        self.kind != HostKind::Domain
    }
}

/// Lowercase, drop one trailing dot, and catch IP literals hiding in opaque hosts.
fn classify_domain_host(domain: &str, input: &str) -> Result<(String, HostKind), Error> {
    let mut normalized = domain.to_ascii_lowercase();
    if normalized.ends_with('.') {
        normalized.pop();
    }

    if normalized.is_empty() {
        return Err(Error::invalid_url(input, "empty hostname"));
    }

    // Non-special schemes keep numeric hosts as opaque strings
    if normalized.parse::<Ipv4Addr>().is_ok() {
        return Ok((normalized, HostKind::Ipv4));
    }
    if normalized.starts_with('[') {
        let inner = normalized
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| Error::invalid_url(input, "invalid bracketed hostname"))?;
        if inner.parse::<Ipv6Addr>().is_err() {
            return Err(Error::invalid_url(
                input,
                "brackets only allowed for IPv6 addresses",
            ));
        }
        return Ok((inner.to_string(), HostKind::Ipv6));
    }

    Ok((normalized, HostKind::Domain))
}

/// Extract the hostname from either a bare hostname or a full URL.
///
/// Brackets around IPv6 literals are removed. Returns `None` for URLs that
/// do not parse or have no host.
pub(crate) fn target_host(target: &str) -> Option<String> {
    let target = target.trim();
    if target.contains("://") {
        let host = match Url::parse(target) {
            Ok(url) => match url.host()? {
                Host::Ipv4(ip) => ip.to_string(),
                Host::Ipv6(ip) => ip.to_string(),
                Host::Domain(domain) => domain.trim_end_matches('.').to_ascii_lowercase(),
            },
            // Names ending in a numeric label fail WHATWG IPv4 parsing but still resolve
            Err(_) => normalize_bare_host(raw_authority_host(target)?),
        };
        return (!host.is_empty()).then_some(host);
    }

    let host = normalize_bare_host(target);
    (!host.is_empty()).then_some(host)
}

fn normalize_bare_host(host: &str) -> String {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Host portion of `scheme://[userinfo@]host[:port][/path]`, taken from the raw text.
///
/// IPv6 literals keep their brackets.
fn raw_authority_host(url: &str) -> Option<&str> {
    let (_, after_scheme) = url.split_once("://")?;

    let host_end = after_scheme
        .find(['/', '\\', '?', '#'])
        .unwrap_or(after_scheme.len());

    let authority = &after_scheme[..host_end];

    let host_with_port = authority
        .rfind('@')
        .map(|i| &authority[i + 1..])
        .unwrap_or(authority);

    // Be careful with IPv6 brackets when removing port
    let host = if host_with_port.starts_with('[') {
        host_with_port
            .find(']')
            .map(|i| &host_with_port[..=i])
            .unwrap_or(host_with_port)
    } else {
        host_with_port
            .rfind(':')
            .map(|i| &host_with_port[..i])
            .unwrap_or(host_with_port)
    };
    Some(host)
}

/// Strip userinfo (username:password) from URLs before logging.
pub(crate) fn redact_url_credentials(raw: &str) -> Cow<'_, str> {
    if !raw.contains('@') {
        return Cow::Borrowed(raw);
    }
    if let Ok(mut parsed) = Url::parse(raw) {
        if !parsed.username().is_empty() || parsed.password().is_some() {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            return Cow::Owned(parsed.to_string());
        }
    }
    Cow::Borrowed(raw)
}

/// Reject non-standard IPv4 spellings in the raw URL text.
fn reject_non_standard_ip_in_raw_url(url: &str) -> Result<(), Error> {
    let url_lower = url.to_ascii_lowercase();
    let Some(host) = raw_authority_host(&url_lower) else {
        return Ok(());
    };

    if host.starts_with('[') {
        return Ok(());
    }

    check_non_standard_ip(host, url)
}

/// Whether a label would be read as a number by a WHATWG URL parser.
fn is_numeric_label(label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    if let Some(hex) = label.strip_prefix("0x") {
        return hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    label.chars().all(|c| c.is_ascii_digit())
}

/// Check whether an IPv4-looking host uses anything but dotted-quad decimal.
fn check_non_standard_ip(host: &str, original_url: &str) -> Result<(), Error> {
    let host = host.strip_suffix('.').unwrap_or(host);
    let parts: Vec<&str> = host.split('.').collect();

    // Only hosts ending in a numeric label are parsed as IPv4
    match parts.last() {
        Some(last) if is_numeric_label(last) => {}
        _ => return Ok(()),
    }

    if parts
        .iter()
        .any(|p| p.starts_with("0x") && is_numeric_label(p))
    {
        return Err(Error::invalid_url(
            original_url,
            "hexadecimal IP encoding not allowed",
        ));
    }

    // Single number (e.g., 2130706433 = 127.0.0.1)
    if parts.len() == 1 {
        return Err(Error::invalid_url(
            original_url,
            "decimal IP encoding not allowed",
        ));
    }

    // Short-form: 127.1 → 127.0.0.1, 127.0.1 → 127.0.0.1
    if (parts.len() == 2 || parts.len() == 3) && parts.iter().all(|p| is_numeric_label(p)) {
        return Err(Error::invalid_url(
            original_url,
            "short-form IP encoding not allowed",
        ));
    }

    if parts.len() == 4 {
        for part in &parts {
            // Leading zero with more digits = octal (e.g., 0177 = 127)
            if part.len() > 1 && part.starts_with('0') && part.chars().all(|c| c.is_ascii_digit())
            {
                return Err(Error::invalid_url(
                    original_url,
                    "octal IP encoding not allowed",
                ));
            }
        }
    }

    Ok(())
}
