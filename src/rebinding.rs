//! DNS rebinding guard.
//!
//! A hostname that passed the static checks can still point at loopback when
//! the request is actually made. This guard asks the resolver what the name
//! resolves to *now*; call it as close to the outbound request as possible.
//!
//! Resolver failures fail open: an unreachable or erroring resolver yields
//! "not loopback". This is the opposite of the static checks, which fail
//! closed. [`RebindingGuard::check`] exposes the underlying error for callers
//! that want to decide differently.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use hickory_resolver::TokioResolver;
use tokio::runtime::RuntimeFlavor;
use tracing::{debug, warn};

use crate::error::Error;
use crate::parsed_url::{redact_url_credentials, target_host};
use crate::ranges::{is_loopback_v4, IpLiteral};

/// Upper bound on a single DNS lookup.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of IPv4 address records.
///
/// Implemented by [`SystemResolver`]; tests substitute static answers.
pub trait DnsResolver {
    /// Current A records for `host`.
    fn lookup_ipv4(&self, host: &str)
        -> impl Future<Output = Result<Vec<Ipv4Addr>, Error>> + Send;
}

/// Resolver backed by the system configuration (`/etc/resolv.conf`, hosts file).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl DnsResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, Error> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| Error::dns(host, e.to_string()))?
            .build();

        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| Error::dns(host, e.to_string()))?;

        Ok(response
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }
}

/// Time-of-use check that a hostname does not currently resolve to loopback.
///
/// Stateless apart from its configuration; safe to share and to call
/// repeatedly for the same host.
#[derive(Debug, Clone)]
pub struct RebindingGuard<R = SystemResolver> {
    resolver: R,
    timeout: Duration,
}

impl RebindingGuard<SystemResolver> {
    pub fn new() -> Self {
        Self::with_resolver(SystemResolver)
    }
}

impl Default for RebindingGuard<SystemResolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DnsResolver> RebindingGuard<R> {
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    /// Replace the lookup timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `target` and return the first loopback answer, if any.
    ///
    /// `target` may be a hostname or a full URL. IP literals are judged
    /// directly without a lookup.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if no hostname can be extracted
    /// - [`Error::Dns`] if the lookup fails or exceeds the timeout
    pub async fn check(&self, target: &str) -> Result<Option<IpAddr>, Error> {
        let host = target_host(target)
            .ok_or_else(|| Error::invalid_url(target, "no hostname to resolve"))?;

        match IpLiteral::parse(&host) {
            IpLiteral::V4(v4) => return Ok(is_loopback_v4(v4).then_some(IpAddr::V4(v4))),
            IpLiteral::V6(v6) => {
                let loopback =
                    v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(is_loopback_v4);
                return Ok(loopback.then_some(IpAddr::V6(v6)));
            }
            IpLiteral::Unparseable => {}
        }

        let addrs = tokio::time::timeout(self.timeout, self.resolver.lookup_ipv4(&host))
            .await
            .map_err(|_| Error::dns(&host, "DNS lookup timed out"))??;

        Ok(addrs
            .into_iter()
            .find(|ip| is_loopback_v4(*ip))
            .map(IpAddr::V4))
    }

    /// Whether `target` currently resolves to a loopback address.
    ///
    /// Returns `false` on any resolution error.
    pub async fn resolves_to_loopback(&self, target: &str) -> bool {
        match self.check(target).await {
            Ok(Some(ip)) => {
                warn!(target = %redact_url_credentials(target), %ip, "hostname resolves to loopback");
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!(
                    target = %redact_url_credentials(target),
                    error = %e,
                    "rebinding check could not resolve, treating as not loopback"
                );
                false
            }
        }
    }

    /// Synchronous version of [`resolves_to_loopback`](Self::resolves_to_loopback).
    ///
    /// Inside a multi-threaded Tokio runtime the current worker is handed
    /// over with `block_in_place`. A current-thread runtime cannot block, so
    /// the lookup runs on a scoped thread with a runtime of its own; the same
    /// happens outside any runtime.
    pub fn resolves_to_loopback_sync(&self, target: &str) -> bool
    where
        R: Sync,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.resolves_to_loopback(target)))
            }
            _ => self.block_on_fresh_runtime(target),
        }
    }

    fn block_on_fresh_runtime(&self, target: &str) -> bool
    where
        R: Sync,
    {
        let joined = std::thread::scope(|scope| {
            scope
                .spawn(|| match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt.block_on(self.resolves_to_loopback(target)),
                    Err(e) => {
                        debug!(error = %e, "could not start runtime for rebinding check");
                        false
                    }
                })
                .join()
        });
        joined.unwrap_or_else(|_| {
            debug!("rebinding check thread panicked");
            false
        })
    }
}
