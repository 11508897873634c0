//! Protocol adapters used by the resolver's fallback chain.
//!
//! Each adapter answers one question for one domain: is it registered?
//! Adapters return a decisive [`CheckResult`] or an error, and decide for
//! themselves whether an error lets the chain move on to the next protocol.

use crate::error::DomainCheckError;
use crate::types::{CheckMethod, CheckResult};
use futures::future::BoxFuture;

/// DNS presence check
pub mod dns;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// Registry mappings and bootstrap discovery
pub mod registry;

/// WHOIS protocol implementation
pub mod whois;

pub use dns::DnsLookup;
pub use rdap::{extract_domain_info, RdapClient};
pub use whois::{parse_whois_response, WhoisClient, WhoisOutcome};

/// One step of the fallback chain.
pub trait Lookup: Send + Sync {
    /// Protocol reported in results.
    fn method(&self) -> CheckMethod;

    /// Query the protocol once. Transient failures are retried by the caller.
    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>>;

    /// Whether the next adapter may be tried after `err`. When this returns
    /// false the chain stops and `err` becomes the domain's outcome.
    fn falls_through(&self, err: &DomainCheckError) -> bool;

    /// Whether transient errors go through the retry policy.
    fn retried(&self) -> bool {
        true
    }
}
