//! RDAP endpoint discovery and WHOIS server caching.
//!
//! RDAP endpoints come from a built-in table for common TLDs and from the
//! IANA bootstrap registry for everything else. WHOIS servers are learned
//! from IANA referrals. Both live in one process-wide cache of registry data.

use crate::error::DomainCheckError;
use crate::validate::public_suffix;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Bootstrap cache TTL: RDAP endpoints rarely change
const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);

struct RegistryCache {
    /// TLD -> RDAP base URL (from IANA bootstrap)
    rdap_endpoints: HashMap<String, String>,
    /// TLD -> WHOIS server; an empty string records "no server"
    whois_servers: HashMap<String, String>,
    /// TLDs absent from the bootstrap file
    no_rdap: HashSet<String>,
    last_fetch: Option<Instant>,
}

impl RegistryCache {
    fn new() -> Self {
        Self {
            rdap_endpoints: HashMap::new(),
            whois_servers: HashMap::new(),
            no_rdap: HashSet::new(),
            last_fetch: None,
        }
    }

    fn is_stale(&self) -> bool {
        self.last_fetch
            .map_or(true, |t| t.elapsed() > BOOTSTRAP_TTL)
    }
}

lazy_static::lazy_static! {
    static ref REGISTRY_CACHE: Mutex<RegistryCache> = Mutex::new(RegistryCache::new());
    // Serializes bootstrap downloads so a burst of workers fetches once.
    static ref FETCH_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

fn lock_cache() -> Result<std::sync::MutexGuard<'static, RegistryCache>, DomainCheckError> {
    REGISTRY_CACHE
        .lock()
        .map_err(|_| DomainCheckError::internal("Failed to acquire registry cache lock"))
}

/// Built-in TLD -> RDAP base URL table. Used before any network lookup.
pub fn rdap_registry_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        ("org", "https://rdap.publicinterestregistry.org/rdap/domain/"),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        ("store", "https://rdap.centralnic.com/store/domain/"),
        ("shop", "https://rdap.gmoregistry.net/rdap/domain/"),
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        ("live", "https://rdap.identitydigital.services/rdap/domain/"),
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
        ("au", "https://rdap.cctld.au/rdap/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("in", "https://rdap.nixiregistry.in/rdap/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cloud", "https://rdap.registry.cloud/rdap/domain/"),
    ])
}

/// The top-level label registries index by (`example.co.uk` -> `uk`).
///
/// The public suffix decides where the registrable part ends, but both the
/// RDAP bootstrap file and IANA WHOIS are keyed by the last label.
pub fn registry_tld(domain: &str) -> Result<String, DomainCheckError> {
    let domain = domain.trim().trim_end_matches('.');
    if !domain.contains('.') {
        return Err(DomainCheckError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        ));
    }
    let (suffix, _) = public_suffix(domain);
    suffix
        .rsplit('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DomainCheckError::invalid_domain(domain, "Missing top-level label"))
}

/// Look up the RDAP base URL for a TLD.
///
/// Order: built-in table, fresh cache hit, negative cache, then (when
/// `use_bootstrap`) one download of the IANA file and a re-check. A TLD
/// still missing afterwards is negatively cached and reported as a
/// [`DomainCheckError::BootstrapError`], which lets the resolver fall back.
pub async fn rdap_endpoint(tld: &str, use_bootstrap: bool) -> Result<String, DomainCheckError> {
    let tld = tld.to_lowercase();

    if let Some(endpoint) = rdap_registry_map().get(tld.as_str()) {
        return Ok(endpoint.to_string());
    }

    {
        let cache = lock_cache()?;
        if !cache.is_stale() {
            if let Some(endpoint) = cache.rdap_endpoints.get(&tld) {
                return Ok(endpoint.clone());
            }
            if cache.no_rdap.contains(&tld) {
                return Err(DomainCheckError::bootstrap(&tld, "TLD has no RDAP service"));
            }
        }
    }

    if !use_bootstrap {
        return Err(DomainCheckError::bootstrap(
            &tld,
            "no built-in RDAP endpoint and bootstrap disabled",
        ));
    }

    ensure_bootstrap().await?;

    let mut cache = lock_cache()?;
    if let Some(endpoint) = cache.rdap_endpoints.get(&tld) {
        return Ok(endpoint.clone());
    }
    cache.no_rdap.insert(tld.clone());
    Err(DomainCheckError::bootstrap(
        &tld,
        "TLD not found in IANA bootstrap registry",
    ))
}

/// Download the bootstrap file unless a fresh copy is cached.
pub async fn ensure_bootstrap() -> Result<(), DomainCheckError> {
    let _guard = FETCH_LOCK.lock().await;
    if !lock_cache()?.is_stale() {
        return Ok(());
    }

    let endpoints = fetch_bootstrap().await?;
    info!(tlds = endpoints.len(), "loaded IANA RDAP bootstrap registry");

    let mut cache = lock_cache()?;
    cache.rdap_endpoints = endpoints;
    cache.last_fetch = Some(Instant::now());
    cache.no_rdap.clear();
    Ok(())
}

async fn fetch_bootstrap() -> Result<HashMap<String, String>, DomainCheckError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            DomainCheckError::network_with_source("Failed to create HTTP client", e.to_string())
        })?;

    debug!(url = BOOTSTRAP_URL, "fetching RDAP bootstrap registry");
    let response = client.get(BOOTSTRAP_URL).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(DomainCheckError::rdap_with_status(
            "*",
            "bootstrap registry request failed",
            status,
        ));
    }

    let json: serde_json::Value = response.json().await?;
    parse_bootstrap(&json)
}

/// Parse the IANA `dns.json` layout: `services: [[[tlds...], [urls...]], ...]`.
pub fn parse_bootstrap(
    json: &serde_json::Value,
) -> Result<HashMap<String, String>, DomainCheckError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| DomainCheckError::parse("bootstrap JSON has no 'services' array"))?;

    let mut endpoints = HashMap::new();
    for service in services.iter().filter_map(|s| s.as_array()) {
        let (Some(tlds), Some(urls)) = (
            service.first().and_then(|t| t.as_array()),
            service.get(1).and_then(|u| u.as_array()),
        ) else {
            continue;
        };

        // Prefer an https base when the service lists several.
        let url = urls
            .iter()
            .filter_map(|u| u.as_str())
            .find(|u| u.starts_with("https://"))
            .or_else(|| urls.iter().find_map(|u| u.as_str()));
        let Some(url) = url else { continue };

        let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
        for tld in tlds.iter().filter_map(|t| t.as_str()) {
            endpoints.insert(tld.to_lowercase(), endpoint.clone());
        }
    }
    Ok(endpoints)
}

/// Cached WHOIS server for a TLD. `Some(None)` is a cached "no server".
pub fn cached_whois_server(tld: &str) -> Option<Option<String>> {
    let cache = REGISTRY_CACHE.lock().ok()?;
    cache
        .whois_servers
        .get(&tld.to_lowercase())
        .map(|s| (!s.is_empty()).then(|| s.clone()))
}

/// Remember a WHOIS referral; `None` records that the TLD has no server.
pub fn cache_whois_server(tld: &str, server: Option<&str>) -> Result<(), DomainCheckError> {
    lock_cache()?
        .whois_servers
        .insert(tld.to_lowercase(), server.unwrap_or_default().to_string());
    Ok(())
}
