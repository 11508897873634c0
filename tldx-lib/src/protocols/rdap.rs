//! RDAP (Registration Data Access Protocol) implementation.
//!
//! RDAP is the structured JSON successor to WHOIS. A domain object means
//! the name is registered; a 404 means it is not.

use crate::error::DomainCheckError;
use crate::protocols::registry::{rdap_endpoint, registry_tld};
use crate::protocols::Lookup;
use crate::types::{CheckMethod, CheckResult, DomainInfo};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// RDAP client for checking domain availability.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
    use_bootstrap: bool,
    /// Fixed base URL used instead of the registry lookup.
    endpoint: Option<String>,
}

impl RdapClient {
    /// Client with a per-request timeout.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, DomainCheckError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tldx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainCheckError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            use_bootstrap,
            endpoint: None,
        })
    }

    /// Send every query to `base_url` (ending in `domain/`) regardless of TLD.
    pub fn with_endpoint<S: Into<String>>(mut self, base_url: S) -> Self {
        self.endpoint = Some(base_url.into());
        self
    }

    /// Query RDAP for `domain`.
    ///
    /// Returns `registered = true` with the extracted details when the
    /// registry returns a domain object, and `registered = false` on 404.
    /// Everything else is an error; a missing RDAP service for the TLD is a
    /// [`DomainCheckError::BootstrapError`].
    pub async fn check_domain(&self, domain: &str) -> Result<CheckResult, DomainCheckError> {
        let endpoint = match &self.endpoint {
            Some(base) => base.clone(),
            None => rdap_endpoint(&registry_tld(domain)?, self.use_bootstrap).await?,
        };
        let url = format!("{}{}", endpoint, domain);

        debug!(%url, "RDAP request");
        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        debug!(domain, status = status.as_u16(), "RDAP response");

        match status {
            StatusCode::OK => {
                let json = response.json::<serde_json::Value>().await.map_err(|e| {
                    DomainCheckError::rdap(domain, format!("Failed to parse JSON: {}", e))
                })?;
                if json.get("objectClassName").and_then(|o| o.as_str()) == Some("error") {
                    return Err(DomainCheckError::rdap(domain, "server returned an error object"));
                }

                let info = extract_domain_info(&json);
                let details = if info.status.is_empty() {
                    "RDAP registered".to_string()
                } else {
                    format!("RDAP registered: [{}]", info.status.join(" "))
                };
                Ok(CheckResult::registered(CheckMethod::Rdap, details).with_info(info))
            }
            StatusCode::NOT_FOUND => Ok(CheckResult::not_registered(
                CheckMethod::Rdap,
                "RDAP object does not exist",
            )),
            code => Err(DomainCheckError::rdap_with_status(
                domain,
                format!("RDAP server returned {}", code),
                code.as_u16(),
            )),
        }
    }
}

impl Lookup for RdapClient {
    fn method(&self) -> CheckMethod {
        CheckMethod::Rdap
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
        Box::pin(self.check_domain(domain))
    }

    /// Only a TLD without RDAP service lets the chain continue.
    fn falls_through(&self, err: &DomainCheckError) -> bool {
        err.is_no_rdap_server()
    }
}

/// Extract registration details from an RDAP domain object.
pub fn extract_domain_info(json: &serde_json::Value) -> DomainInfo {
    let mut info = DomainInfo::default();

    if let Some(entities) = json.get("entities").and_then(|e| e.as_array()) {
        info.registrar = entities
            .iter()
            .filter(|entity| {
                entity
                    .get("roles")
                    .and_then(|r| r.as_array())
                    .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrar")))
            })
            .find_map(|entity| extract_vcard_name(entity).or_else(|| extract_entity_identifier(entity)));
    }

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            let action = event.get("eventAction").and_then(|a| a.as_str());
            let date = event.get("eventDate").and_then(|d| d.as_str());
            match (action, date) {
                (Some("registration"), Some(date)) => info.creation_date = Some(date.to_string()),
                (Some("expiration"), Some(date)) => info.expiration_date = Some(date.to_string()),
                _ => {}
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        info.status = statuses
            .iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect();
    }

    info
}

/// The `fn` property of an entity's vCard.
fn extract_vcard_name(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("vcardArray")
        .and_then(|v| v.get(1))
        .and_then(|items| items.as_array())?
        .iter()
        .filter_map(|item| item.as_array())
        .find(|item| item.len() >= 4 && item[0].as_str() == Some("fn"))
        .and_then(|item| item[3].as_str())
        .filter(|name| !name.trim().is_empty())
        .map(String::from)
}

/// publicIds identifier, then handle, then name.
fn extract_entity_identifier(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .or_else(|| entity.get("handle"))
        .or_else(|| entity.get("name"))
        .and_then(|v| v.as_str())
        .map(String::from)
}
