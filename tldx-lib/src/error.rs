//! Error handling for candidate generation and domain resolution.
//!
//! Every failure in the library is a [`DomainCheckError`]. Protocol adapters
//! tag their failures through [`DomainCheckError::class`] so the retry policy
//! and the fallback chain never have to inspect message text.

use std::fmt;
use std::time::Duration;

/// Retry classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt after a backoff (timeouts, resets, 5xx, 429).
    Transient,
    /// Retrying will not change the outcome.
    Permanent,
    /// The registry has no object for the name.
    NotFound,
}

/// Main error type for tldx operations.
#[derive(Debug, Clone)]
pub enum DomainCheckError {
    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// Malformed bracket/brace pattern
    InvalidPattern { pattern: String, reason: String },

    /// Connection-level failures (refused, reset, DNS of the server itself)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP protocol errors, with the HTTP status when one was received
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// WHOIS protocol errors
    WhoisError {
        domain: String,
        message: String,
        transient: bool,
    },

    /// DNS fallback found nothing or failed
    DnsError { domain: String, message: String },

    /// No RDAP service is bootstrapped for the TLD
    BootstrapError { tld: String, message: String },

    /// JSON or text parsing errors
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Invalid settings
    ConfigError { message: String },

    /// File I/O errors when reading keyword lists or config files
    FileError { path: String, message: String },

    /// The per-check deadline expired. Request-level timeouts are
    /// `NetworkError`s and stay retryable.
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Shutdown was requested before the work finished
    Cancelled { operation: String },

    /// Every fallback method was inconclusive
    UnknownStatus {
        domain: String,
        cause: Box<DomainCheckError>,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainCheckError {
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// WHOIS failure that is worth retrying (rate limit, dropped connection).
    pub fn whois_transient<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
            transient: true,
        }
    }

    pub fn dns<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::DnsError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn cancelled<O: Into<String>>(operation: O) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Wrap the last cause once the whole fallback chain came up empty.
    pub fn unknown_status<D: Into<String>>(domain: D, cause: DomainCheckError) -> Self {
        Self::UnknownStatus {
            domain: domain.into(),
            cause: Box::new(cause),
        }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Retry classification used by [`crate::RetryPolicy`].
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NetworkError { .. } => ErrorClass::Transient,
            Self::RdapError {
                status_code: Some(404),
                ..
            } => ErrorClass::NotFound,
            Self::RdapError {
                status_code: Some(429 | 500..=599),
                ..
            } => ErrorClass::Transient,
            Self::WhoisError { transient, .. } if *transient => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }

    /// Check if this error suggests the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// True for deadline expiry and shutdown, which end a check regardless
    /// of the fallback chain.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled { .. })
    }

    /// True when RDAP has no service for the TLD and the next protocol should be tried.
    pub fn is_no_rdap_server(&self) -> bool {
        matches!(self, Self::BootstrapError { .. })
    }
}

impl fmt::Display for DomainCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            Self::NetworkError { message, source } => match source {
                Some(source) => write!(f, "Network error: {} ({})", message, source),
                None => write!(f, "Network error: {}", message),
            },
            Self::RdapError {
                domain,
                message,
                status_code,
            } => match status_code {
                Some(code) => write!(f, "RDAP error for '{}' (HTTP {}): {}", domain, code, message),
                None => write!(f, "RDAP error for '{}': {}", domain, message),
            },
            Self::WhoisError {
                domain, message, ..
            } => {
                write!(f, "WHOIS error for '{}': {}", domain, message)
            }
            Self::DnsError { domain, message } => {
                write!(f, "DNS lookup for '{}' failed: {}", domain, message)
            }
            Self::BootstrapError { tld, message } => {
                write!(f, "No RDAP servers found for '{}': {}", tld, message)
            }
            Self::ParseError { message, .. } => write!(f, "Parse error: {}", message),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => write!(f, "Deadline exceeded after {:?} during {}", duration, operation),
            Self::Cancelled { operation } => write!(f, "Cancelled: {}", operation),
            Self::UnknownStatus { domain, cause } => {
                write!(f, "{} has unknown status: {}", domain, cause)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for DomainCheckError {}

impl From<reqwest::Error> for DomainCheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("HTTP request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() {
            Self::parse(format!("Invalid response body: {}", err))
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<toml::de::Error> for DomainCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing failed: {}", err))
    }
}

impl From<std::io::Error> for DomainCheckError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock => Self::network_with_source("I/O failure", err.to_string()),
            _ => Self::Internal {
                message: format!("I/O error: {}", err),
            },
        }
    }
}
