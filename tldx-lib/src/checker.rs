//! Fallback-chain resolver.
//!
//! A [`DomainChecker`] answers "is this domain registered?" by walking an
//! ordered chain of protocol adapters (RDAP, then DNS, then WHOIS by
//! default). The first decisive answer wins. Each adapter decides whether
//! its own errors let the chain continue; once the chain is exhausted the
//! domain is reported with unknown status, never as available.

use crate::error::DomainCheckError;
use crate::protocols::{DnsLookup, Lookup, RdapClient, WhoisClient};
use crate::retry::RetryPolicy;
use crate::types::{CheckConfig, CheckResult, DomainResult};
use crate::validate::is_valid_domain_or_keyword;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resolves one domain at a time through the fallback chain.
///
/// Cloning is cheap; clones share the adapters and the shutdown token, so
/// every worker of the concurrency engine can hold its own copy.
///
/// # Example
///
/// ```rust,no_run
/// use tldx_lib::{CheckConfig, DomainChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = DomainChecker::with_config(CheckConfig::default())?;
///     let result = checker.check("example.com").await;
///     println!("{}: {}", result.domain, result.details);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainChecker {
    chain: Arc<Vec<Box<dyn Lookup>>>,
    retry: RetryPolicy,
    /// Deadline for one domain, retries and fallbacks included
    timeout: Duration,
    shutdown: CancellationToken,
}

impl DomainChecker {
    /// RDAP, then DNS, then WHOIS, configured from `config`.
    pub fn with_config(config: CheckConfig) -> Result<Self, DomainCheckError> {
        let rdap = RdapClient::with_config(config.rdap_timeout, config.enable_bootstrap)?;
        let dns = DnsLookup::from_system(config.rdap_timeout);
        let whois = WhoisClient::new(config.whois_timeout);

        Ok(Self::with_chain(
            vec![Box::new(rdap), Box::new(dns), Box::new(whois)],
            &config,
        ))
    }

    /// Checker over an explicit adapter chain, tried in order.
    pub fn with_chain(chain: Vec<Box<dyn Lookup>>, config: &CheckConfig) -> Self {
        Self {
            chain: Arc::new(chain),
            retry: RetryPolicy::from_config(config),
            timeout: config.timeout,
            shutdown: CancellationToken::new(),
        }
    }

    /// Share a shutdown token with the caller. Cancelling it stops pending
    /// retries and keeps further adapters from being tried.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Walk the chain for `domain` without a deadline.
    ///
    /// # Errors
    ///
    /// - `InvalidDomain` for malformed input, before any network call
    /// - `Cancelled` when shutdown was requested
    /// - `UnknownStatus` wrapping the last adapter error when no adapter
    ///   produced an answer
    pub async fn check_domain(&self, domain: &str) -> Result<CheckResult, DomainCheckError> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if !domain.contains('.') || !is_valid_domain_or_keyword(&domain) {
            return Err(DomainCheckError::invalid_domain(
                &domain,
                "not a fully qualified domain name",
            ));
        }

        let mut last_error = None;
        for adapter in self.chain.iter() {
            if self.shutdown.is_cancelled() {
                return Err(DomainCheckError::cancelled(format!("check {}", domain)));
            }

            let adapter: &dyn Lookup = adapter.as_ref();
            let name: &str = &domain;
            let method = adapter.method();
            let outcome = if adapter.retried() {
                let label = format!("{} {}", method, name);
                self.retry
                    .run(&label, &self.shutdown, move || adapter.lookup(name))
                    .await
            } else {
                adapter.lookup(name).await
            };

            match outcome {
                Ok(result) => {
                    debug!(%domain, %method, registered = result.registered, "resolved");
                    return Ok(result);
                }
                Err(err) if err.is_deadline() => return Err(err),
                Err(err) => {
                    let next = adapter.falls_through(&err);
                    debug!(%domain, %method, error = %err, fall_through = next, "adapter failed");
                    last_error = Some(err);
                    if !next {
                        break;
                    }
                }
            }
        }

        let cause = last_error
            .unwrap_or_else(|| DomainCheckError::internal("no lookup adapters configured"));
        Err(DomainCheckError::unknown_status(domain, cause))
    }

    /// Check `domain` under the per-domain deadline. Never fails: errors are
    /// carried inside the returned [`DomainResult`].
    pub async fn check(&self, domain: &str) -> DomainResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.check_domain(domain)).await;

        let mut result = match outcome {
            Ok(Ok(check)) => DomainResult::from_check(domain, check),
            Ok(Err(err)) => DomainResult::from_error(domain, err),
            Err(_) => DomainResult::from_error(
                domain,
                DomainCheckError::timeout(format!("check {}", domain), self.timeout),
            ),
        };
        result.check_duration = Some(started.elapsed());
        result
    }
}
