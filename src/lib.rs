//! # url-warden
//!
//! SSRF defense for user-supplied URLs.
//!
//! `url-warden` decides whether a URL may be treated as a remote resource
//! locator without letting the server reach itself or internal
//! infrastructure. It does not fetch anything. Two checks are exposed:
//!
//! - [`validate`]: static checks (scheme gate, host classification, IP range
//!   table or domain allow-list). Pure and synchronous; always returns a
//!   [`Verdict`].
//! - [`resolves_to_loopback`]: the DNS rebinding guard. Asks the resolver
//!   what a hostname points at right now. Fails open on resolver errors.
//!
//! Call the guard again right before the actual request: a name that passed
//! validation can be re-pointed afterwards.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url_warden::{resolves_to_loopback, validate};
//!
//! # async fn example() {
//! let url = "https://plus.unsplash.com/photo";
//! let verdict = validate(url);
//! if verdict.is_valid() && !resolves_to_loopback(url).await {
//!     // safe to hand to the fetcher
//! }
//! # }
//! ```

mod config;
mod domain;
mod error;
mod parsed_url;
mod ranges;
mod rebinding;
mod scheme;
mod validate;
mod verdict;

pub use config::{RangeConfig, ValidatorBuilder, ValidatorConfig};
pub use domain::{is_legitimate_domain, TrustAllowlist, DEFAULT_TRUSTED_DOMAINS};
pub use error::Error;
pub use parsed_url::{HostKind, ParsedUrl};
pub use ranges::{AddressRange, AddressRangeTable, IpLiteral};
pub use rebinding::{DnsResolver, RebindingGuard, SystemResolver, DEFAULT_DNS_TIMEOUT};
pub use scheme::DEFAULT_SCHEMES;
pub use validate::{default_validator, resolves_to_loopback, validate, Approved, Validator};
pub use verdict::{Reason, Verdict};
