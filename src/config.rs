//! Static validator configuration.
//!
//! A [`Validator`] is built once at process start, either in code through
//! [`ValidatorBuilder`] or from a TOML file through [`ValidatorConfig`], and
//! is immutable afterwards. There is no runtime mutation API.
//!
//! Built-in address ranges cannot be removed, only extended:
//!
//! ```rust
//! use url_warden::{Reason, Validator};
//!
//! let validator = Validator::builder()
//!     .trust_domain("images.example.com")
//!     .block_cidr("100.64.0.0/10", Reason::PrivateRangeAddress)
//!     .build()
//!     .unwrap();
//!
//! assert!(validator.validate("https://images.example.com/cat.jpg").is_valid());
//! assert!(!validator.validate("https://100.64.0.1/").is_valid());
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{is_legitimate_domain, TrustAllowlist, DEFAULT_TRUSTED_DOMAINS};
use crate::error::Error;
use crate::ranges::{AddressRange, AddressRangeTable};
use crate::rebinding::DEFAULT_DNS_TIMEOUT;
use crate::scheme::{normalize_scheme, DEFAULT_SCHEMES};
use crate::validate::Validator;
use crate::verdict::Reason;

/// Builder for [`Validator`].
///
/// Each method consumes `self`. Invalid entries are collected and reported
/// together by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ValidatorBuilder {
    schemes: Vec<String>,
    trusted_domains: Vec<String>,
    extra_ranges: Vec<AddressRange>,
    dns_timeout: Duration,
    problems: Vec<String>,
}

impl ValidatorBuilder {
    /// An empty builder: no schemes, no trusted domains, built-in ranges only.
    pub fn new() -> Self {
        Self {
            schemes: Vec::new(),
            trusted_domains: Vec::new(),
            extra_ranges: Vec::new(),
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            problems: Vec::new(),
        }
    }

    /// A builder pre-loaded with the default schemes and trusted domains.
    pub fn with_defaults() -> Self {
        let builder = DEFAULT_SCHEMES
            .iter()
            .fold(Self::new(), |b, scheme| b.allow_scheme(scheme));
        DEFAULT_TRUSTED_DOMAINS
            .iter()
            .fold(builder, |b, domain| b.trust_domain(domain))
    }

    /// Allow a URL scheme (`"https"` or `"https:"`).
    pub fn allow_scheme(mut self, scheme: &str) -> Self {
        let normalized = normalize_scheme(scheme);
        if !is_valid_scheme(&normalized) {
            self.problems.push(format!("invalid scheme {scheme:?}"));
            return self;
        }
        if matches!(normalized.as_str(), "http:" | "ws:") {
            warn!(scheme = %normalized, "allowing a plaintext scheme");
        }
        if !self.schemes.contains(&normalized) {
            self.schemes.push(normalized);
        }
        self
    }

    /// Add an exact hostname to the trust allow-list.
    pub fn trust_domain(mut self, domain: &str) -> Self {
        if !is_legitimate_domain(domain) {
            self.problems
                .push(format!("trusted domain {domain:?} is not a legitimate hostname"));
            return self;
        }
        self.trusted_domains.push(domain.to_string());
        self
    }

    /// Block an additional CIDR range, checked after the built-in ranges.
    pub fn block_cidr(mut self, cidr: &str, reason: Reason) -> Self {
        if reason.is_acceptance() {
            self.problems
                .push(format!("range {cidr} needs a rejection reason, got {}", reason.code()));
            return self;
        }
        match cidr.trim().parse::<IpNet>() {
            Ok(net) => self.extra_ranges.push(AddressRange::new(net.trunc(), reason)),
            Err(e) => self.problems.push(format!("invalid CIDR {cidr:?}: {e}")),
        }
        self
    }

    /// Upper bound on each rebinding-guard DNS lookup.
    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Build the validator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every rejected entry, or if no scheme
    /// is allowed or the DNS timeout is zero.
    pub fn build(mut self) -> Result<Validator, Error> {
        if self.schemes.is_empty() {
            self.problems.push("at least one scheme must be allowed".to_string());
        }
        if self.dns_timeout.is_zero() {
            self.problems.push("DNS timeout must be non-zero".to_string());
        }
        if !self.problems.is_empty() {
            for problem in &self.problems {
                warn!(%problem, "rejected validator configuration entry");
            }
            return Err(Error::config(self.problems.join("; ")));
        }

        Ok(Validator::from_parts(
            self.schemes,
            TrustAllowlist::new(self.trusted_domains),
            AddressRangeTable::with_extra(self.extra_ranges),
            self.dns_timeout,
        ))
    }
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_scheme(normalized: &str) -> bool {
    let Some(name) = normalized.strip_suffix(':') else {
        return false;
    };
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// An extra blocked range in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub cidr: String,
    #[serde(default = "default_range_reason")]
    pub reason: Reason,
}

fn default_range_reason() -> Reason {
    Reason::PrivateRangeAddress
}

/// File form of the validator configuration.
///
/// Every field is optional; missing fields take the built-in defaults.
///
/// ```toml
/// allowed_schemes = ["https", "wss"]
/// trusted_domains = ["plus.unsplash.com"]
/// dns_timeout_ms = 2000
///
/// [[extra_blocked_ranges]]
/// cidr = "100.64.0.0/10"
/// reason = "private-range-address"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub allowed_schemes: Vec<String>,
    pub trusted_domains: Vec<String>,
    pub extra_blocked_ranges: Vec<RangeConfig>,
    pub dns_timeout_ms: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            trusted_domains: DEFAULT_TRUSTED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            extra_blocked_ranges: Vec::new(),
            dns_timeout_ms: DEFAULT_DNS_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ValidatorConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        toml::from_str(data).map_err(|e| Error::config(e.to_string()))
    }

    /// Read a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&data)
    }

    pub fn into_builder(self) -> ValidatorBuilder {
        let builder = ValidatorBuilder::new().dns_timeout(Duration::from_millis(self.dns_timeout_ms));
        let builder = self
            .allowed_schemes
            .iter()
            .fold(builder, |b, scheme| b.allow_scheme(scheme));
        let builder = self
            .trusted_domains
            .iter()
            .fold(builder, |b, domain| b.trust_domain(domain));
        self.extra_blocked_ranges
            .iter()
            .fold(builder, |b, range| b.block_cidr(&range.cidr, range.reason))
    }

    pub fn build(self) -> Result<Validator, Error> {
        self.into_builder().build()
    }
}
