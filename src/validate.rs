//! The staged validation pipeline.

use std::sync::LazyLock;
use std::time::Duration;

use tracing::debug;

use crate::config::ValidatorBuilder;
use crate::domain::{TrustAllowlist, DEFAULT_TRUSTED_DOMAINS};
use crate::error::Error;
use crate::parsed_url::{redact_url_credentials, HostKind, ParsedUrl};
use crate::ranges::AddressRangeTable;
use crate::rebinding::{DnsResolver, RebindingGuard, DEFAULT_DNS_TIMEOUT};
use crate::scheme::{is_scheme_allowed, DEFAULT_SCHEMES};
use crate::verdict::{Reason, Verdict};

static DEFAULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(Validator::default);

/// A URL that passed the static checks and the rebinding guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approved {
    /// The URL as supplied.
    pub url: String,

    /// Hostname the checks were run on (IPv6 without brackets).
    pub host: String,

    pub kind: HostKind,

    /// Why the static checks accepted it.
    pub reason: Reason,
}

/// Immutable validator configuration plus the checks that use it.
///
/// Holds no mutable state, so one instance can be shared freely between
/// threads. Build one with [`Validator::builder`] or [`ValidatorConfig`](crate::ValidatorConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    schemes: Vec<String>,
    allowlist: TrustAllowlist,
    ranges: AddressRangeTable,
    dns_timeout: Duration,
}

impl Default for Validator {
    fn default() -> Self {
        Self::from_parts(
            DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            TrustAllowlist::new(DEFAULT_TRUSTED_DOMAINS),
            AddressRangeTable::builtin(),
            DEFAULT_DNS_TIMEOUT,
        )
    }
}

impl Validator {
    pub(crate) fn from_parts(
        schemes: Vec<String>,
        allowlist: TrustAllowlist,
        ranges: AddressRangeTable,
        dns_timeout: Duration,
    ) -> Self {
        Self {
            schemes,
            allowlist,
            ranges,
            dns_timeout,
        }
    }

    /// A builder starting from the default configuration.
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::with_defaults()
    }

    pub fn allowed_schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn allowlist(&self) -> &TrustAllowlist {
        &self.allowlist
    }

    pub fn ranges(&self) -> &AddressRangeTable {
        &self.ranges
    }

    pub fn dns_timeout(&self) -> Duration {
        self.dns_timeout
    }

    /// Run the static checks on a candidate URL.
    ///
    /// Scheme gate, then host classification, then either the IP range table
    /// or the domain evaluator. Never fails: malformed input is a rejection.
    /// Pure, so repeated calls with the same input give the same verdict.
    ///
    /// An accepted domain says nothing about what it will resolve to later;
    /// follow up with [`resolves_to_loopback`](Self::resolves_to_loopback)
    /// before fetching.
    pub fn validate(&self, url: &str) -> Verdict {
        let verdict = match self.screen(url) {
            Ok((_, reason)) => Verdict::accept(reason),
            Err(reason) => Verdict::reject(reason),
        };
        debug!(
            url = %redact_url_credentials(url),
            valid = verdict.is_valid(),
            reason = verdict.reason().code(),
            "url verdict"
        );
        verdict
    }

    fn screen(&self, url: &str) -> Result<(ParsedUrl, Reason), Reason> {
        if !is_scheme_allowed(url, &self.schemes) {
            return Err(Reason::UnsupportedScheme);
        }

        let parsed = ParsedUrl::parse(url).map_err(|e| {
            debug!(error = %e, "url failed structural checks");
            Reason::MalformedUrl
        })?;

        // Gate and parser must agree on the scheme
        if !self.schemes.iter().any(|s| s == parsed.scheme()) {
            return Err(Reason::UnsupportedScheme);
        }

        let verdict = if parsed.is_ip_literal() {
            self.ranges.classify_literal(parsed.hostname())
        } else {
            self.allowlist.evaluate(parsed.hostname())
        };

        if verdict.is_valid() {
            Ok((parsed, verdict.reason()))
        } else {
            Err(verdict.reason())
        }
    }

    /// A rebinding guard using this validator's DNS timeout.
    pub fn rebinding_guard(&self) -> RebindingGuard {
        RebindingGuard::new().timeout(self.dns_timeout)
    }

    /// Whether `target` (hostname or URL) currently resolves to loopback.
    ///
    /// Fails open: `false` on any resolution error.
    pub async fn resolves_to_loopback(&self, target: &str) -> bool {
        self.rebinding_guard().resolves_to_loopback(target).await
    }

    /// Static checks followed by the rebinding guard, as one call.
    ///
    /// Call immediately before the outbound request.
    ///
    /// # Errors
    ///
    /// - [`Error::Rejected`] if a static check refuses the URL
    /// - [`Error::ResolvesToLoopback`] if a domain host currently resolves to loopback
    pub async fn vet(&self, url: &str) -> Result<Approved, Error> {
        self.vet_with(url, &self.rebinding_guard()).await
    }

    /// [`vet`](Self::vet) with a caller-supplied guard.
    pub async fn vet_with<R: DnsResolver>(
        &self,
        url: &str,
        guard: &RebindingGuard<R>,
    ) -> Result<Approved, Error> {
        let (parsed, reason) = match self.screen(url) {
            Ok(screened) => screened,
            Err(reason) => return Err(Error::rejected(url, reason)),
        };

        if !parsed.is_ip_literal() && guard.resolves_to_loopback(parsed.hostname()).await {
            return Err(Error::ResolvesToLoopback {
                host: parsed.hostname().to_string(),
            });
        }

        Ok(Approved {
            url: url.to_string(),
            host: parsed.hostname().to_string(),
            kind: parsed.kind(),
            reason,
        })
    }
}

/// The process-wide default validator.
pub fn default_validator() -> &'static Validator {
    &DEFAULT_VALIDATOR
}

/// Validate a URL against the default configuration.
///
/// # Example
///
/// ```rust
/// use url_warden::{validate, Reason};
///
/// let verdict = validate("https://127.0.0.1/x");
/// assert!(!verdict.is_valid());
/// assert_eq!(verdict.reason(), Reason::LoopbackAddress);
///
/// assert!(validate("https://plus.unsplash.com/photo").is_valid());
/// ```
pub fn validate(url: &str) -> Verdict {
    DEFAULT_VALIDATOR.validate(url)
}

/// Whether `target` currently resolves to loopback, using the default
/// validator's timeout. Fails open.
pub async fn resolves_to_loopback(target: &str) -> bool {
    DEFAULT_VALIDATOR.resolves_to_loopback(target).await
}
