//! Domain trust evaluation: syntactic legitimacy plus allow-list membership.
//!
//! Default-deny. The allow-list is the actual gate; legitimacy keeps malformed
//! or confusable names from ever reaching the comparison.

use std::collections::BTreeSet;

use crate::verdict::{Reason, Verdict};

/// Hostnames trusted when no configuration overrides them.
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    "plus.unsplash.com",
    "trusted-domain-1.com",
    "trusted-domain-2.com",
];

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Suffixes that only mean something on a private network.
const INTERNAL_SUFFIXES: &[&str] = &[
    "localhost",
    "localdomain",
    "local",
    "internal",
    "intranet",
    "arpa",
    "home",
    "lan",
    "corp",
];

/// Whether `hostname` is a syntactically legitimate public domain name.
///
/// Rules:
/// - ASCII only; punycode (`xn--`) labels are refused as well
/// - no wildcards
/// - at least two labels; a bare top-level domain is not a hostname
/// - labels of 1..=63 characters from `[a-z0-9-]`, not starting or ending with `-`
/// - at most 253 characters in total
/// - alphabetic top-level label of two or more characters
/// - not under an internal suffix such as `.local` or `.internal`
///
/// Case-insensitive. A single trailing dot is tolerated.
pub fn is_legitimate_domain(hostname: &str) -> bool {
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);

    if hostname.is_empty() || hostname.len() > MAX_DOMAIN_LEN || !hostname.is_ascii() {
        return false;
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }

    let Some(tld) = labels.last() else {
        return false;
    };
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    !is_internal_suffix(hostname)
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    if label.len() >= 4 && label[..4].eq_ignore_ascii_case("xn--") {
        return false;
    }
    label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_internal_suffix(hostname: &str) -> bool {
    let lower = hostname.to_ascii_lowercase();
    INTERNAL_SUFFIXES.iter().any(|suffix| {
        lower == *suffix
            || lower
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Fixed set of exact hostnames considered pre-approved.
///
/// Entries are compared lowercase, with any trailing dot removed. No
/// wildcard or suffix matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAllowlist {
    domains: BTreeSet<String>,
}

impl TrustAllowlist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| normalize_entry(d.as_ref()))
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.domains.contains(&normalize_entry(hostname))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    /// Verdict for a hostname known not to be an IP literal.
    ///
    /// Both predicates must hold; legitimacy alone earns nothing.
    pub fn evaluate(&self, hostname: &str) -> Verdict {
        if !is_legitimate_domain(hostname) {
            return Verdict::reject(Reason::DomainNotLegitimate);
        }
        if !self.contains(hostname) {
            return Verdict::reject(Reason::DomainNotAllowlisted);
        }
        Verdict::accept(Reason::TrustedDomain)
    }
}

fn normalize_entry(domain: &str) -> String {
    let trimmed = domain.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Legitimacy ====================

    #[test]
    fn test_legitimate_domains() {
        for host in [
            "example.com",
            "plus.unsplash.com",
            "a.b.c.d.example.org",
            "trusted-domain-1.com",
            "123host.example.com",
            "EXAMPLE.COM",
            "example.com.",
        ] {
            assert!(is_legitimate_domain(host), "should accept: {host}");
        }
    }

    #[test]
    fn test_structural_failures() {
        let long_label = format!("{}.com", "a".repeat(64));
        let long_name = format!("{}.com", ["abcdefghij"; 25].join("."));
        for host in [
            "",
            ".",
            "com",
            "localhost",
            "example..com",
            ".example.com",
            "-example.com",
            "example-.com",
            "exa_mple.com",
            "exa mple.com",
            "example.c",
            "example.123",
            long_label.as_str(),
            long_name.as_str(),
        ] {
            assert!(!is_legitimate_domain(host), "should reject: {host:?}");
        }
    }

    #[test]
    fn test_label_length_boundary() {
        let max_label = format!("{}.com", "a".repeat(63));
        assert!(is_legitimate_domain(&max_label));
    }

    #[test]
    fn test_wildcards_rejected() {
        assert!(!is_legitimate_domain("*.example.com"));
        assert!(!is_legitimate_domain("api.*.example.com"));
    }

    #[test]
    fn test_unicode_and_punycode_rejected() {
        assert!(!is_legitimate_domain("bücher.example"));
        assert!(!is_legitimate_domain("xn--bcher-kva.example"));
        assert!(!is_legitimate_domain("XN--bcher-kva.example"));
        assert!(!is_legitimate_domain("example.xn--p1ai"));
    }

    #[test]
    fn test_internal_suffixes_rejected() {
        for host in [
            "printer.local",
            "metadata.google.internal",
            "evil.localhost",
            "1.0.0.127.in-addr.arpa",
            "nas.home",
            "db.corp",
        ] {
            assert!(!is_legitimate_domain(host), "should reject: {host}");
        }
        // Suffix match is label-aligned
        assert!(is_legitimate_domain("mylocal.com"));
        assert!(is_legitimate_domain("example.homes"));
    }

    // ==================== Allow-list ====================

    #[test]
    fn test_allowlist_normalizes_entries() {
        let list = TrustAllowlist::new(["Plus.Unsplash.com.", "  cdn.example.com ", ""]);
        assert_eq!(list.len(), 2);
        assert!(list.contains("plus.unsplash.com"));
        assert!(list.contains("PLUS.UNSPLASH.COM"));
        assert!(list.contains("cdn.example.com."));
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            ["cdn.example.com", "plus.unsplash.com"]
        );
    }

    #[test]
    fn test_allowlist_is_exact() {
        let list = TrustAllowlist::new(["example.com"]);
        assert!(!list.contains("sub.example.com"));
        assert!(!list.contains("example.com.evil.net"));
        assert!(!list.contains("evilexample.com"));
    }

    // ==================== Evaluation ====================

    #[test]
    fn test_evaluate_trusted() {
        let list = TrustAllowlist::new(DEFAULT_TRUSTED_DOMAINS);
        let verdict = list.evaluate("plus.unsplash.com");
        assert!(verdict.is_valid());
        assert_eq!(verdict.reason(), Reason::TrustedDomain);
    }

    #[test]
    fn test_evaluate_legitimate_but_not_allowlisted() {
        let list = TrustAllowlist::new(DEFAULT_TRUSTED_DOMAINS);
        let verdict = list.evaluate("example.com");
        assert!(!verdict.is_valid());
        assert_eq!(verdict.reason(), Reason::DomainNotAllowlisted);
    }

    #[test]
    fn test_evaluate_allowlisted_but_not_legitimate() {
        let list = TrustAllowlist::new(["bad_host.example.com", "intranet.local"]);
        for host in ["bad_host.example.com", "intranet.local"] {
            let verdict = list.evaluate(host);
            assert!(!verdict.is_valid());
            assert_eq!(verdict.reason(), Reason::DomainNotLegitimate, "{host}");
        }
    }

    #[test]
    fn test_empty_allowlist_denies_everything() {
        let list = TrustAllowlist::default();
        assert!(list.is_empty());
        assert_eq!(
            list.evaluate("example.com").reason(),
            Reason::DomainNotAllowlisted
        );
    }
}
