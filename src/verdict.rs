//! Verdicts returned by the static URL checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Why a URL was accepted or rejected.
///
/// Rejection variants form a stable taxonomy; [`Reason::code`] gives the
/// machine-readable kebab-case code, `Display` the message shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// An IP literal outside every blocked range.
    PublicAddress,
    /// A legitimate, allow-listed domain name.
    TrustedDomain,

    UnsupportedScheme,
    MalformedUrl,
    LoopbackAddress,
    UnspecifiedAddress,
    PrivateRangeAddress,
    LinkLocalAddress,
    TeredoAddress,
    MappedAddress,
    UniqueLocalAddress,
    DomainNotLegitimate,
    DomainNotAllowlisted,
    DnsResolutionError,
}

impl Reason {
    /// Stable kebab-case identifier, suitable for logs and API payloads.
    pub fn code(self) -> &'static str {
        match self {
            Reason::PublicAddress => "public-address",
            Reason::TrustedDomain => "trusted-domain",
            Reason::UnsupportedScheme => "unsupported-scheme",
            Reason::MalformedUrl => "malformed-url",
            Reason::LoopbackAddress => "loopback-address",
            Reason::UnspecifiedAddress => "unspecified-address",
            Reason::PrivateRangeAddress => "private-range-address",
            Reason::LinkLocalAddress => "link-local-address",
            Reason::TeredoAddress => "teredo-address",
            Reason::MappedAddress => "mapped-address",
            Reason::UniqueLocalAddress => "unique-local-address",
            Reason::DomainNotLegitimate => "domain-not-legitimate",
            Reason::DomainNotAllowlisted => "domain-not-allowlisted",
            Reason::DnsResolutionError => "dns-resolution-error",
        }
    }

    /// Whether this reason describes an accepted URL.
    pub fn is_acceptance(self) -> bool {
        matches!(self, Reason::PublicAddress | Reason::TrustedDomain)
    }

    /// Parse a kebab-case code back into a reason.
    pub fn from_code(code: &str) -> Option<Self> {
        ALL_REASONS.iter().copied().find(|r| r.code() == code)
    }
}

const ALL_REASONS: &[Reason] = &[
    Reason::PublicAddress,
    Reason::TrustedDomain,
    Reason::UnsupportedScheme,
    Reason::MalformedUrl,
    Reason::LoopbackAddress,
    Reason::UnspecifiedAddress,
    Reason::PrivateRangeAddress,
    Reason::LinkLocalAddress,
    Reason::TeredoAddress,
    Reason::MappedAddress,
    Reason::UniqueLocalAddress,
    Reason::DomainNotLegitimate,
    Reason::DomainNotAllowlisted,
    Reason::DnsResolutionError,
];

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Reason::PublicAddress => "Valid IP address",
            Reason::TrustedDomain => "URL is valid and safe",
            Reason::UnsupportedScheme => "Unsupported URL schema",
            Reason::MalformedUrl | Reason::DnsResolutionError => {
                "Invalid URL or DNS resolution error"
            }
            Reason::LoopbackAddress => "URL resolves to localhost (loopback address)",
            Reason::UnspecifiedAddress
            | Reason::PrivateRangeAddress
            | Reason::LinkLocalAddress
            | Reason::TeredoAddress
            | Reason::MappedAddress
            | Reason::UniqueLocalAddress => "Unsafe IP address",
            Reason::DomainNotLegitimate | Reason::DomainNotAllowlisted => "Unsafe URL provided",
        };
        f.write_str(message)
    }
}

/// Outcome of [`Validator::validate`](crate::Validator::validate).
///
/// Carries no identity and is never persisted. `is_valid` always agrees with
/// the polarity of `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    is_valid: bool,
    reason: Reason,
}

impl Verdict {
    pub(crate) fn accept(reason: Reason) -> Self {
        debug_assert!(reason.is_acceptance());
        Self {
            is_valid: true,
            reason,
        }
    }

    pub(crate) fn reject(reason: Reason) -> Self {
        debug_assert!(!reason.is_acceptance());
        Self {
            is_valid: false,
            reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Human-readable message for the end user.
    pub fn message(&self) -> String {
        self.reason.to_string()
    }

    /// Turn a rejection into [`Error::Rejected`].
    pub fn into_result(self, url: &str) -> Result<Reason, Error> {
        if self.is_valid {
            Ok(self.reason)
        } else {
            Err(Error::rejected(url, self.reason))
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Verdict", 3)?;
        state.serialize_field("is_valid", &self.is_valid)?;
        state.serialize_field("reason", &self.reason)?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_valid { "accepted" } else { "rejected" };
        write!(f, "{} ({}): {}", status, self.reason.code(), self.reason)
    }
}
