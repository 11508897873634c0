//! Configuration files and environment overrides.
//!
//! Precedence, highest first: CLI flags, `TLDX_*` environment variables,
//! an explicit config file, discovered config files, built-in defaults.
//! This module covers everything below the CLI; the binary applies its
//! flags on top of the resulting [`CheckConfig`].

use crate::error::DomainCheckError;
use crate::types::{CheckConfig, PatternErrorPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound for the worker pool size.
pub const MAX_CONCURRENCY: usize = 1000;

/// Layout of a `tldx.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Named TLD lists; a name shared with a builtin preset replaces it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_presets: Option<HashMap<String, Vec<String>>>,
}

/// Values for the `[defaults]` section. Every field is optional so layers
/// can be merged field by field. The same shape carries `TLDX_*` values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,

    /// 0 disables the length bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_domain_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<bool>,

    /// 0 means "use available hardware parallelism"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Durations as strings: "500ms", "5s", "2m", or bare seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pattern_combinations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_errors: Option<PatternErrorPolicy>,
}

impl DefaultsConfig {
    /// Field-wise merge; values set in `higher` win.
    pub fn overlay(self, higher: DefaultsConfig) -> DefaultsConfig {
        DefaultsConfig {
            tlds: higher.tlds.or(self.tlds),
            preset: higher.preset.or(self.preset),
            prefixes: higher.prefixes.or(self.prefixes),
            suffixes: higher.suffixes.or(self.suffixes),
            max_domain_length: higher.max_domain_length.or(self.max_domain_length),
            regex: higher.regex.or(self.regex),
            concurrency: higher.concurrency.or(self.concurrency),
            timeout: higher.timeout.or(self.timeout),
            max_retries: higher.max_retries.or(self.max_retries),
            initial_backoff: higher.initial_backoff.or(self.initial_backoff),
            max_backoff: higher.max_backoff.or(self.max_backoff),
            backoff_factor: higher.backoff_factor.or(self.backoff_factor),
            only_available: higher.only_available.or(self.only_available),
            verbose: higher.verbose.or(self.verbose),
            max_pattern_combinations: higher
                .max_pattern_combinations
                .or(self.max_pattern_combinations),
            pattern_errors: higher.pattern_errors.or(self.pattern_errors),
        }
    }

    /// Write every set value into `config`.
    pub fn apply_to(&self, config: &mut CheckConfig) -> Result<(), DomainCheckError> {
        if let Some(tlds) = &self.tlds {
            config.tlds = tlds.clone();
        }
        if let Some(preset) = &self.preset {
            config.tld_preset = Some(preset.clone());
        }
        if let Some(prefixes) = &self.prefixes {
            config.prefixes = prefixes.clone();
        }
        if let Some(suffixes) = &self.suffixes {
            config.suffixes = suffixes.clone();
        }
        if let Some(max) = self.max_domain_length {
            config.max_domain_length = (max > 0).then_some(max);
        }
        if let Some(regex) = self.regex {
            config.regex_mode = regex;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = &self.timeout {
            config.timeout = required_duration("timeout", timeout)?;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(initial) = &self.initial_backoff {
            config.initial_backoff = required_duration("initial_backoff", initial)?;
        }
        if let Some(max) = &self.max_backoff {
            config.max_backoff = required_duration("max_backoff", max)?;
        }
        if let Some(factor) = self.backoff_factor {
            config.backoff_factor = factor;
        }
        if let Some(only) = self.only_available {
            config.only_available = only;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(limit) = self.max_pattern_combinations {
            config.max_pattern_combinations = limit;
        }
        if let Some(policy) = self.pattern_errors {
            config.pattern_errors = policy;
        }
        Ok(())
    }
}

/// Configuration discovery and loading.
pub struct ConfigManager {
    /// Report which files were found
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate one config file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainCheckError::config(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        validate_config(&config)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Load every discovered config file and merge them, lowest
    /// precedence first: XDG, home directory, current directory.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainCheckError> {
        let candidates = [
            xdg_config_path(),
            home_config_path(),
            local_config_path(),
        ];

        let mut merged = FileConfig::default();
        let mut loaded = Vec::new();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged = merge_configs(merged, config);
                    loaded.push(path);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "ignoring config file"),
            }
        }

        if self.verbose && loaded.len() > 1 {
            let files: Vec<String> = loaded.iter().map(|p| p.display().to_string()).collect();
            debug!(files = ?files, "merged config files, later entries win");
        }

        Ok(merged)
    }

    /// The explicit file when one is given, otherwise the discovered files.
    pub fn load(&self, explicit: Option<&Path>) -> Result<FileConfig, DomainCheckError> {
        match explicit {
            Some(path) => self.load_file(path),
            None => self.discover_and_load(),
        }
    }
}

fn local_config_path() -> Option<PathBuf> {
    ["./tldx.toml", "./.tldx.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn home_config_path() -> Option<PathBuf> {
    let path = Path::new(&env::var_os("HOME")?).join(".tldx.toml");
    path.exists().then_some(path)
}

fn xdg_config_path() -> Option<PathBuf> {
    let config_dir = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

    let path = config_dir.join("tldx").join("config.toml");
    path.exists().then_some(path)
}

/// Merge two file layers; values in `higher` win and custom presets are
/// unioned with `higher` replacing same-named lists.
pub fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    FileConfig {
        defaults: match (lower.defaults, higher.defaults) {
            (Some(low), Some(high)) => Some(low.overlay(high)),
            (low, high) => high.or(low),
        },
        custom_presets: match (lower.custom_presets, higher.custom_presets) {
            (Some(mut low), Some(high)) => {
                low.extend(high);
                Some(low)
            }
            (low, high) => high.or(low),
        },
    }
}

/// Reject settings that could never produce a sensible run.
pub fn validate_config(config: &FileConfig) -> Result<(), DomainCheckError> {
    if let Some(defaults) = &config.defaults {
        validate_defaults(defaults)?;
    }

    if let Some(presets) = &config.custom_presets {
        for (name, tlds) in presets {
            if name.trim().is_empty() {
                return Err(DomainCheckError::config("Custom preset names cannot be empty"));
            }
            if tlds.is_empty() {
                return Err(DomainCheckError::config(format!(
                    "Custom preset '{}' cannot have an empty TLD list",
                    name
                )));
            }
            if let Some(bad) = tlds
                .iter()
                .find(|tld| tld.trim().is_empty() || tld.contains(char::is_whitespace))
            {
                return Err(DomainCheckError::config(format!(
                    "Invalid TLD '{}' in preset '{}'",
                    bad, name
                )));
            }
        }
    }

    Ok(())
}

fn validate_defaults(defaults: &DefaultsConfig) -> Result<(), DomainCheckError> {
    if let Some(concurrency) = defaults.concurrency {
        if concurrency > MAX_CONCURRENCY {
            return Err(DomainCheckError::config(format!(
                "Concurrency must be between 0 and {}",
                MAX_CONCURRENCY
            )));
        }
    }

    if let Some(factor) = defaults.backoff_factor {
        if !factor.is_finite() || factor < 1.0 {
            return Err(DomainCheckError::config(
                "backoff_factor must be at least 1.0",
            ));
        }
    }

    let timeout = defaults
        .timeout
        .as_deref()
        .map(|s| required_duration("timeout", s))
        .transpose()?;
    if timeout == Some(Duration::ZERO) {
        return Err(DomainCheckError::config("timeout must be greater than zero"));
    }

    let initial = defaults
        .initial_backoff
        .as_deref()
        .map(|s| required_duration("initial_backoff", s))
        .transpose()?;
    let max = defaults
        .max_backoff
        .as_deref()
        .map(|s| required_duration("max_backoff", s))
        .transpose()?;
    if let (Some(initial), Some(max)) = (initial, max) {
        if initial > max {
            return Err(DomainCheckError::config(
                "initial_backoff cannot be larger than max_backoff",
            ));
        }
    }

    if let Some(preset) = &defaults.preset {
        if preset.trim().is_empty() {
            return Err(DomainCheckError::config("preset cannot be empty"));
        }
    }
    if let Some(tlds) = &defaults.tlds {
        if tlds.is_empty() {
            return Err(DomainCheckError::config("tlds cannot be an empty list"));
        }
    }

    Ok(())
}

/// Values read from `TLDX_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub defaults: DefaultsConfig,
    /// `TLDX_CONFIG`
    pub config: Option<PathBuf>,
}

/// Read `TLDX_*` variables from the process environment.
///
/// Invalid values are ignored with a warning.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`] with an injectable variable source.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let mut env_config = EnvConfig::default();
    let d = &mut env_config.defaults;

    d.tlds = var("TLDX_TLDS").map(|v| split_list(&v)).filter(|l| !l.is_empty());
    d.prefixes = var("TLDX_PREFIXES").map(|v| split_list(&v)).filter(|l| !l.is_empty());
    d.suffixes = var("TLDX_SUFFIXES").map(|v| split_list(&v)).filter(|l| !l.is_empty());
    d.preset = var("TLDX_PRESET");

    d.max_domain_length = parsed(&var, "TLDX_MAX_DOMAIN_LENGTH", |v| v.parse::<usize>().ok());
    d.regex = parsed(&var, "TLDX_REGEX", parse_bool);
    d.concurrency = parsed(&var, "TLDX_CONCURRENCY", |v| {
        v.parse::<usize>().ok().filter(|c| *c <= MAX_CONCURRENCY)
    });
    d.timeout = parsed(&var, "TLDX_TIMEOUT", |v| {
        parse_duration(v).filter(|d| !d.is_zero()).map(|_| v.to_string())
    });
    d.max_retries = parsed(&var, "TLDX_MAX_RETRIES", |v| v.parse::<u32>().ok());
    d.initial_backoff = parsed(&var, "TLDX_INITIAL_BACKOFF", |v| {
        parse_duration(v).map(|_| v.to_string())
    });
    d.max_backoff = parsed(&var, "TLDX_MAX_BACKOFF", |v| {
        parse_duration(v).map(|_| v.to_string())
    });
    d.backoff_factor = parsed(&var, "TLDX_BACKOFF_FACTOR", |v| {
        v.parse::<f64>().ok().filter(|f| f.is_finite() && *f >= 1.0)
    });
    d.only_available = parsed(&var, "TLDX_ONLY_AVAILABLE", parse_bool);
    d.verbose = parsed(&var, "TLDX_VERBOSE", parse_bool);

    env_config.config = var("TLDX_CONFIG").map(PathBuf::from);
    env_config
}

/// Parse `key` with `parse`, warning about (and dropping) invalid values.
fn parsed<T, V, P>(var: &V, key: &str, parse: P) -> Option<T>
where
    V: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = var(key)?;
    match parse(&raw) {
        Some(value) => {
            debug!(key, value = %raw, "using environment override");
            Some(value)
        }
        None => {
            warn!(key, value = %raw, "ignoring invalid environment value");
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse "500ms", "1.5s", "2m", or bare seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();
    // Scales are in nanoseconds.
    let (number, scale) = if let Some(ms) = value.strip_suffix("ms") {
        (ms, 1e6)
    } else if let Some(s) = value.strip_suffix('s') {
        (s, 1e9)
    } else if let Some(m) = value.strip_suffix('m') {
        (m, 60e9)
    } else {
        (value.as_str(), 1e9)
    };

    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some(Duration::from_nanos((number * scale).round() as u64))
}

fn required_duration(field: &str, value: &str) -> Result<Duration, DomainCheckError> {
    parse_duration(value).ok_or_else(|| {
        DomainCheckError::config(format!(
            "Invalid {} '{}'. Use a format like '500ms', '5s' or '2m'",
            field, value
        ))
    })
}

/// Build a [`CheckConfig`] from defaults, config files and environment.
///
/// `explicit` (a `--config` path) wins over `TLDX_CONFIG`; either one
/// replaces file discovery.
pub fn resolve_config(
    explicit: Option<&Path>,
    env_config: &EnvConfig,
    verbose: bool,
) -> Result<CheckConfig, DomainCheckError> {
    let manager = ConfigManager::new(verbose);
    let file = manager.load(explicit.or(env_config.config.as_deref()))?;

    let mut config = CheckConfig::default();
    if let Some(presets) = file.custom_presets {
        config.custom_presets = presets;
    }
    file.defaults
        .unwrap_or_default()
        .overlay(env_config.defaults.clone())
        .apply_to(&mut config)?;
    Ok(config)
}
