//! DNS presence check.
//!
//! Used when a TLD has no RDAP service. Any address (or delegation) for the
//! name means someone registered it; silence proves nothing, so a miss is
//! an error that passes the question on to WHOIS.

use crate::error::DomainCheckError;
use crate::protocols::Lookup;
use crate::types::{CheckMethod, CheckResult};
use futures::future::BoxFuture;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::debug;

pub struct DnsLookup {
    resolver: TokioAsyncResolver,
}

impl DnsLookup {
    /// Resolver from the system configuration, or Cloudflare when that
    /// cannot be read.
    pub fn from_system(timeout: Duration) -> Self {
        let resolver = match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, mut opts)) => {
                opts.timeout = timeout;
                TokioAsyncResolver::tokio(config, opts)
            }
            Err(err) => {
                debug!(error = %err, "system resolver config unavailable, using public resolver");
                let mut opts = ResolverOpts::default();
                opts.timeout = timeout;
                TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), opts)
            }
        };
        Self { resolver }
    }

    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    /// True when the name has an address record or a delegation.
    pub async fn resolves(&self, domain: &str) -> bool {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        if let Ok(ips) = self.resolver.lookup_ip(fqdn.as_str()).await {
            if ips.iter().next().is_some() {
                return true;
            }
        }
        matches!(
            self.resolver.ns_lookup(fqdn.as_str()).await,
            Ok(ns) if ns.iter().next().is_some()
        )
    }
}

impl Lookup for DnsLookup {
    fn method(&self) -> CheckMethod {
        CheckMethod::Dns
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
        Box::pin(async move {
            if self.resolves(domain).await {
                Ok(CheckResult::registered(
                    CheckMethod::Dns,
                    format!(
                        "Domain {} has a DNS record, but RDAP is not available",
                        domain
                    ),
                ))
            } else {
                Err(DomainCheckError::dns(domain, "no DNS records"))
            }
        })
    }

    fn falls_through(&self, _err: &DomainCheckError) -> bool {
        true
    }

    /// A missing record is an answer, not a hiccup.
    fn retried(&self) -> bool {
        false
    }
}
