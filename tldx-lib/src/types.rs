//! Core data types shared by the composer, the resolver and the output side.

use crate::error::DomainCheckError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;

/// Verdict of a single resolution: the registration signal plus a
/// human-readable account of which protocol answered and how.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub registered: bool,
    pub details: String,
    pub method: CheckMethod,
    pub info: Option<DomainInfo>,
}

impl CheckResult {
    pub fn registered<D: Into<String>>(method: CheckMethod, details: D) -> Self {
        Self {
            registered: true,
            details: details.into(),
            method,
            info: None,
        }
    }

    pub fn not_registered<D: Into<String>>(method: CheckMethod, details: D) -> Self {
        Self {
            registered: false,
            details: details.into(),
            method,
            info: None,
        }
    }

    pub fn with_info(mut self, info: DomainInfo) -> Self {
        self.info = Some(info);
        self
    }
}

/// Per-domain outcome emitted by the concurrency engine.
///
/// `available` is only meaningful when `error` is `None`.
#[derive(Debug, Clone, Serialize)]
pub struct DomainResult {
    /// The domain name that was checked (e.g., "example.com")
    pub domain: String,

    pub available: bool,

    pub details: String,

    /// Set when every fallback failed, the deadline fired, or the run was cancelled.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<DomainCheckError>,

    /// Which protocol produced the verdict
    pub method_used: CheckMethod,

    /// Registration details extracted from RDAP or WHOIS, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<DomainInfo>,

    #[serde(skip)]
    pub check_duration: Option<Duration>,
}

fn serialize_error<S: Serializer>(
    error: &Option<DomainCheckError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl DomainResult {
    pub fn from_check(domain: impl Into<String>, result: CheckResult) -> Self {
        Self {
            domain: domain.into(),
            available: !result.registered,
            details: result.details,
            error: None,
            method_used: result.method,
            info: result.info,
            check_duration: None,
        }
    }

    pub fn from_error(domain: impl Into<String>, error: DomainCheckError) -> Self {
        let details = match &error {
            DomainCheckError::UnknownStatus { .. } => "This domain has unknown status".to_string(),
            other => other.to_string(),
        };
        Self {
            domain: domain.into(),
            available: false,
            details,
            error: Some(error),
            method_used: CheckMethod::Unknown,
            info: None,
            check_duration: None,
        }
    }

    /// Deadline expiry, as opposed to any other failure.
    pub fn timed_out(&self) -> bool {
        matches!(self.error, Some(DomainCheckError::Timeout { .. }))
    }

    pub fn is_available(&self) -> bool {
        self.error.is_none() && self.available
    }
}

/// Registration information extracted from RDAP or WHOIS responses.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DomainInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    /// Domain status codes (e.g., "clientTransferProhibited")
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
}

/// Protocol that decided a domain's status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckMethod {
    #[serde(rename = "rdap")]
    Rdap,

    #[serde(rename = "dns")]
    Dns,

    #[serde(rename = "whois")]
    Whois,

    #[serde(rename = "unknown")]
    Unknown,
}

impl std::fmt::Display for CheckMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckMethod::Rdap => write!(f, "RDAP"),
            CheckMethod::Dns => write!(f, "DNS"),
            CheckMethod::Whois => write!(f, "WHOIS"),
            CheckMethod::Unknown => write!(f, "Unknown"),
        }
    }
}

/// What the composer does with a pattern that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternErrorPolicy {
    /// Fail the whole compile.
    #[default]
    Abort,
    /// Drop the offending pattern and record a warning.
    Skip,
}

impl std::str::FromStr for PatternErrorPolicy {
    type Err = DomainCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(DomainCheckError::config(format!(
                "Unknown pattern error policy '{}' (expected 'abort' or 'skip')",
                other
            ))),
        }
    }
}

pub const DEFAULT_MAX_DOMAIN_LENGTH: usize = 64;
pub const DEFAULT_MAX_PATTERN_COMBINATIONS: u64 = 100_000;
pub const DEFAULT_CONCURRENCY: usize = 15;

/// Run configuration threaded from the input supplier through the
/// composer, the engine and the output sink.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Explicit TLDs, validated against the public suffix list at compile time
    pub tlds: Vec<String>,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,

    /// Preset name, or "all"
    pub tld_preset: Option<String>,

    /// Candidates longer than this are dropped. `None` disables the bound.
    pub max_domain_length: Option<usize>,

    /// Treat inputs containing `[`, `{` or `\` as patterns
    pub regex_mode: bool,

    pub max_pattern_combinations: u64,
    pub pattern_errors: PatternErrorPolicy,

    /// Worker pool size. 0 means available hardware parallelism.
    pub concurrency: usize,

    /// Deadline for one domain's whole resolution
    pub timeout: Duration,

    /// Per-request timeouts
    pub rdap_timeout: Duration,
    pub whois_timeout: Duration,

    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: f64,

    /// Fetch the IANA bootstrap file for TLDs missing from the built-in table
    pub enable_bootstrap: bool,

    pub only_available: bool,
    pub verbose: bool,

    /// User presets from config files; these replace builtins of the same name
    pub custom_presets: HashMap<String, Vec<String>>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            tlds: Vec::new(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            tld_preset: None,
            max_domain_length: Some(DEFAULT_MAX_DOMAIN_LENGTH),
            regex_mode: false,
            max_pattern_combinations: DEFAULT_MAX_PATTERN_COMBINATIONS,
            pattern_errors: PatternErrorPolicy::Abort,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(15),
            rdap_timeout: Duration::from_secs(8),
            whois_timeout: Duration::from_secs(8),
            max_retries: 3,
            initial_backoff: Duration::from_millis(1500),
            max_backoff: Duration::from_secs(5),
            backoff_factor: 1.5,
            enable_bootstrap: true,
            only_available: false,
            verbose: false,
            custom_presets: HashMap::new(),
        }
    }
}

impl CheckConfig {
    pub fn with_tlds(mut self, tlds: Vec<String>) -> Self {
        self.tlds = tlds;
        self
    }

    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_preset<S: Into<String>>(mut self, preset: S) -> Self {
        self.tld_preset = Some(preset.into());
        self
    }

    pub fn with_max_domain_length(mut self, max: Option<usize>) -> Self {
        self.max_domain_length = max;
        self
    }

    pub fn with_regex(mut self, enabled: bool) -> Self {
        self.regex_mode = enabled;
        self
    }

    pub fn with_pattern_errors(mut self, policy: PatternErrorPolicy) -> Self {
        self.pattern_errors = policy;
        self
    }

    /// Set the worker pool size. Capped at 1000.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.min(1000);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration, factor: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_factor = factor;
        self
    }

    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.enable_bootstrap = enabled;
        self
    }

    /// Pool size after resolving the "0 means hardware parallelism" rule.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
