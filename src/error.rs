//! Error types for url-warden.

use thiserror::Error;

use crate::verdict::Reason;

/// Errors produced while vetting URLs or building a validator.
#[derive(Debug, Error)]
pub enum Error {
    /// URL could not be parsed or failed structural screening.
    #[error("Invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL was refused by one of the static checks.
    #[error("URL rejected ({}): {reason}", .reason.code())]
    Rejected { url: String, reason: Reason },

    /// Hostname currently resolves to a loopback address.
    #[error("DNS rebinding blocked: {host} resolves to localhost")]
    ResolvesToLoopback { host: String },

    /// DNS resolution failed or timed out.
    #[error("DNS error for {host}: {message}")]
    Dns { host: String, message: String },

    /// Validator configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn rejected(url: impl Into<String>, reason: Reason) -> Self {
        Self::Rejected {
            url: url.into(),
            reason,
        }
    }

    pub(crate) fn dns(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dns {
            host: host.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The taxonomy reason this error corresponds to, if any.
    pub fn reason(&self) -> Option<Reason> {
        match self {
            Error::InvalidUrl { .. } => Some(Reason::MalformedUrl),
            Error::Rejected { reason, .. } => Some(*reason),
            Error::ResolvesToLoopback { .. } => Some(Reason::LoopbackAddress),
            Error::Dns { .. } => Some(Reason::DnsResolutionError),
            Error::Config(_) => None,
        }
    }
}
