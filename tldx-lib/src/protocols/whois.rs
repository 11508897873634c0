//! WHOIS protocol implementation (RFC 3912, TCP port 43).
//!
//! The authoritative server for a TLD comes from an IANA referral and is
//! cached. Responses are free text; [`parse_whois_response`] only extracts
//! the registration signal plus registrar and creation date.

use crate::error::DomainCheckError;
use crate::protocols::registry::{cache_whois_server, cached_whois_server, registry_tld};
use crate::protocols::Lookup;
use crate::types::{CheckMethod, CheckResult, DomainInfo};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";
const WHOIS_PORT: u16 = 43;
/// Responses beyond this are truncated; the signal is always near the top.
const MAX_RESPONSE_BYTES: u64 = 512 * 1024;

lazy_static::lazy_static! {
    // Serializes IANA referrals so a cold cache costs one query per TLD.
    static ref REFER_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

/// What a WHOIS response says about a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoisOutcome {
    NotFound,
    Registered {
        registrar: Option<String>,
        created: Option<String>,
    },
    RateLimited,
    /// Neither a "no match" message nor registration fields
    Unparseable,
}

#[derive(Clone)]
pub struct WhoisClient {
    timeout: Duration,
    iana_server: String,
    port: u16,
}

impl WhoisClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            iana_server: IANA_WHOIS_SERVER.to_string(),
            port: WHOIS_PORT,
        }
    }

    /// Connect to a non-standard port (local relays, tests).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Ask `server` instead of IANA for referrals.
    pub fn with_iana_server<S: Into<String>>(mut self, server: S) -> Self {
        self.iana_server = server.into();
        self
    }

    /// Send one query and read until the server closes the connection.
    pub async fn query(&self, server: &str, query: &str) -> Result<String, DomainCheckError> {
        let exchange = async {
            let mut stream = TcpStream::connect((server, self.port)).await?;
            stream.write_all(format!("{}\r\n", query).as_bytes()).await?;
            let mut buf = Vec::new();
            (&mut stream)
                .take(MAX_RESPONSE_BYTES)
                .read_to_end(&mut buf)
                .await?;
            Ok::<_, std::io::Error>(buf)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(Err(e)) => Err(DomainCheckError::network_with_source(
                format!("WHOIS query to {} failed", server),
                e.to_string(),
            )),
            Err(_) => Err(DomainCheckError::network(format!(
                "WHOIS query to {} timed out after {:?}",
                server, self.timeout
            ))),
        }
    }

    /// Authoritative WHOIS server for `tld`, asking IANA on a cache miss.
    pub async fn server_for(&self, tld: &str) -> Result<Option<String>, DomainCheckError> {
        if let Some(cached) = cached_whois_server(tld) {
            return Ok(cached);
        }
        let _guard = REFER_LOCK.lock().await;
        if let Some(cached) = cached_whois_server(tld) {
            return Ok(cached);
        }
        let response = self.query(&self.iana_server, tld).await?;
        let server = parse_iana_refer_response(&response);
        debug!(tld, server = ?server, "IANA WHOIS referral");
        cache_whois_server(tld, server.as_deref())?;
        Ok(server)
    }

    pub async fn check_domain(&self, domain: &str) -> Result<CheckResult, DomainCheckError> {
        let tld = registry_tld(domain)?;
        let server = self
            .server_for(&tld)
            .await?
            .ok_or_else(|| DomainCheckError::whois(domain, format!("no WHOIS server for .{}", tld)))?;

        let response = self.query(&server, domain).await?;

        match parse_whois_response(&response) {
            WhoisOutcome::NotFound => Ok(CheckResult::not_registered(
                CheckMethod::Whois,
                "Domain not registered (WHOIS says not found)",
            )),
            WhoisOutcome::Registered { registrar, created } => {
                let details = format!(
                    "WHOIS Registered: {} ({})",
                    registrar.as_deref().unwrap_or("<unknown>"),
                    created.as_deref().unwrap_or("<unknown>")
                );
                let info = DomainInfo {
                    registrar,
                    creation_date: created,
                    ..Default::default()
                };
                Ok(CheckResult::registered(CheckMethod::Whois, details).with_info(info))
            }
            WhoisOutcome::RateLimited => Err(DomainCheckError::whois_transient(
                domain,
                format!("rate limited by {}", server),
            )),
            WhoisOutcome::Unparseable => Ok(CheckResult::not_registered(
                CheckMethod::Whois,
                format!("Failed to parse WHOIS for {}", domain),
            )),
        }
    }
}

impl Lookup for WhoisClient {
    fn method(&self) -> CheckMethod {
        CheckMethod::Whois
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
        Box::pin(self.check_domain(domain))
    }

    fn falls_through(&self, _err: &DomainCheckError) -> bool {
        true
    }
}

const NOT_FOUND_PATTERNS: &[&str] = &[
    "no match for",
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "status: available",
    "status: free",
    "no matching record",
    "the queried object does not exist",
    "object does not exist",
    "this domain name has not been registered",
    "is available for registration",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "rate-limited",
];

const REGISTRAR_KEYS: &[&str] = &[
    "registrar",
    "registrar name",
    "sponsoring registrar",
    "registrar organization",
];

const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "registered on",
    "registration time",
    "domain registration date",
];

const TAKEN_KEYS: &[&str] = &[
    "domain status",
    "registry domain id",
    "registrant",
    "name server",
    "nserver",
    "registry expiry date",
    "expiry date",
    "updated date",
];

/// Classify a WHOIS response.
pub fn parse_whois_response(response: &str) -> WhoisOutcome {
    let lower = response.to_lowercase();

    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return WhoisOutcome::RateLimited;
    }
    if NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
        return WhoisOutcome::NotFound;
    }

    let mut registrar = None;
    let mut created = None;
    let mut taken_fields = 0;

    for line in response.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if registrar.is_none() && REGISTRAR_KEYS.contains(&key.as_str()) {
            registrar = Some(value.to_string());
        } else if created.is_none() && CREATED_KEYS.contains(&key.as_str()) {
            created = Some(value.to_string());
        } else if TAKEN_KEYS.contains(&key.as_str()) {
            taken_fields += 1;
        }
    }

    if registrar.is_some() || created.is_some() || taken_fields >= 2 {
        WhoisOutcome::Registered { registrar, created }
    } else {
        WhoisOutcome::Unparseable
    }
}

/// Parse an IANA WHOIS response for the authoritative WHOIS server.
///
/// `refer:` wins over `whois:` when both are present.
///
/// ```text
/// whois:        whois.verisign-grs.com
/// refer:        whois.verisign-grs.com
/// ```
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut whois_server = None;

    for line in response.lines().map(str::trim) {
        if let Some(server) = line.strip_prefix("refer:").map(str::trim) {
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line.strip_prefix("whois:").map(str::trim) {
            if !server.is_empty() {
                whois_server = Some(server.to_string());
            }
        }
    }

    whois_server
}
