//! Candidate generation.
//!
//! The composer turns raw keywords into the list of fully-qualified
//! candidates handed to the resolution engine:
//!
//! 1. lowercase every input
//! 2. expand patterns (when enabled), guarded by the combination ceiling
//! 3. validate keywords, collecting TLDs from full-domain inputs
//! 4. resolve the TLD set (explicit, discovered, preset, fallback `com`)
//! 5. build `{prefix}{keyword}{suffix}.{tld}` permutations
//! 6. dedupe and apply the length bound
//!
//! Problems with individual TLDs, presets or oversized patterns become
//! [`ComposeWarning`]s. Only a pattern syntax error can fail the compile,
//! and only under [`PatternErrorPolicy::Abort`].

use crate::error::DomainCheckError;
use crate::pattern::{expand_pattern, is_pattern, is_pattern_safe};
use crate::presets::{resolve_tld_preset, tld_store, PresetStore};
use crate::types::{CheckConfig, PatternErrorPolicy};
use crate::validate::{public_suffix, validate_keywords};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Non-fatal problem found while composing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeWarning {
    InvalidTld(String),
    PresetNotFound(String),
    UnsafePattern {
        pattern: String,
        combinations: u64,
        limit: u64,
    },
    /// Only produced under [`PatternErrorPolicy::Skip`]
    PatternSyntax { pattern: String, reason: String },
}

impl fmt::Display for ComposeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTld(tld) => write!(f, "{}: invalid TLD", tld),
            Self::PresetNotFound(name) => write!(f, "TLD preset not found: {}", name),
            Self::UnsafePattern {
                pattern,
                combinations,
                limit,
            } => write!(
                f,
                "pattern '{}' skipped: {} combinations exceeds limit of {}",
                pattern, combinations, limit
            ),
            Self::PatternSyntax { pattern, reason } => {
                write!(f, "pattern '{}' skipped: {}", pattern, reason)
            }
        }
    }
}

/// Output of [`Composer::compile`].
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Deduplicated, length-filtered candidates in first-seen order
    pub domains: Vec<String>,
    pub warnings: Vec<ComposeWarning>,
    /// The effective TLD set the candidates were built from
    pub tlds: Vec<String>,
    /// Validated keywords (after pattern expansion) the candidates came from
    pub keywords: Vec<String>,
}

pub struct Composer<'a> {
    config: &'a CheckConfig,
    presets: PresetStore<Vec<String>>,
}

impl<'a> Composer<'a> {
    /// Composer using the builtin TLD presets plus the config's custom ones.
    pub fn new(config: &'a CheckConfig) -> Self {
        Self {
            config,
            presets: tld_store(&config.custom_presets),
        }
    }

    pub fn with_presets(config: &'a CheckConfig, presets: PresetStore<Vec<String>>) -> Self {
        Self { config, presets }
    }

    pub fn compile<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Composition, DomainCheckError> {
        let mut warnings = Vec::new();

        let lowered: Vec<String> = inputs
            .iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .collect();

        let expanded = if self.config.regex_mode {
            self.expand_patterns(&lowered, &mut warnings)?
        } else {
            lowered
        };

        let validated = validate_keywords(&expanded);
        let tlds = self.resolve_tlds(&validated.discovered_tlds, &mut warnings);
        debug!(
            keywords = validated.keywords.len(),
            tlds = tlds.len(),
            "composing candidates"
        );

        let mut seen = HashSet::new();
        let mut domains = Vec::new();
        for keyword in &validated.keywords {
            for base in affix_bases(keyword, &self.config.prefixes, &self.config.suffixes) {
                for tld in &tlds {
                    let candidate = format!("{}.{}", base, tld);
                    let fits = self
                        .config
                        .max_domain_length
                        .map_or(true, |max| candidate.len() <= max);
                    if fits && seen.insert(candidate.clone()) {
                        domains.push(candidate);
                    }
                }
            }
        }

        Ok(Composition {
            domains,
            warnings,
            tlds,
            keywords: validated.keywords,
        })
    }

    fn expand_patterns(
        &self,
        inputs: &[String],
        warnings: &mut Vec<ComposeWarning>,
    ) -> Result<Vec<String>, DomainCheckError> {
        let limit = self.config.max_pattern_combinations;
        let mut out = Vec::new();

        for input in inputs {
            if !is_pattern(input) {
                out.push(input.clone());
                continue;
            }

            let checked = is_pattern_safe(input, limit).and_then(|(safe, combinations)| {
                if safe {
                    expand_pattern(input).map(Some)
                } else {
                    warnings.push(ComposeWarning::UnsafePattern {
                        pattern: input.clone(),
                        combinations,
                        limit,
                    });
                    Ok(None)
                }
            });

            match checked {
                Ok(Some(names)) => out.extend(names),
                Ok(None) => {}
                Err(err) => match self.config.pattern_errors {
                    PatternErrorPolicy::Abort => return Err(err),
                    PatternErrorPolicy::Skip => {
                        let reason = match &err {
                            DomainCheckError::InvalidPattern { reason, .. } => reason.clone(),
                            other => other.to_string(),
                        };
                        warnings.push(ComposeWarning::PatternSyntax {
                            pattern: input.clone(),
                            reason,
                        });
                    }
                },
            }
        }

        Ok(out)
    }

    fn resolve_tlds(&self, discovered: &[String], warnings: &mut Vec<ComposeWarning>) -> Vec<String> {
        let mut tlds = Vec::new();

        for candidate in self.config.tlds.iter().chain(discovered) {
            let (suffix, known) = public_suffix(candidate);
            if known && !suffix.is_empty() {
                tlds.push(suffix);
            } else {
                warnings.push(ComposeWarning::InvalidTld(candidate.clone()));
            }
        }

        if let Some(preset) = self
            .config
            .tld_preset
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        {
            match resolve_tld_preset(&self.presets, preset) {
                Some(extra) => tlds.extend(extra),
                None => warnings.push(ComposeWarning::PresetNotFound(preset.to_string())),
            }
        }

        let mut seen = HashSet::new();
        tlds.retain(|t| seen.insert(t.clone()));

        if tlds.is_empty() {
            tlds.push("com".to_string());
        }
        tlds
    }
}

/// The keyword bare, with each prefix, each prefix+suffix pair and each suffix.
fn affix_bases(keyword: &str, prefixes: &[String], suffixes: &[String]) -> Vec<String> {
    let mut bases = vec![keyword.to_string()];
    for prefix in prefixes {
        bases.push(format!("{}{}", prefix, keyword));
        for suffix in suffixes {
            bases.push(format!("{}{}{}", prefix, keyword, suffix));
        }
    }
    for suffix in suffixes {
        bases.push(format!("{}{}", keyword, suffix));
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_to_com() {
        let config = CheckConfig::default();
        let out = Composer::new(&config).compile(&["Alpha", "beta"]).unwrap();
        assert_eq!(out.domains, vec!["alpha.com", "beta.com"]);
        assert!(out.warnings.is_empty());
        assert_eq!(out.tlds, vec!["com"]);
    }

    #[test]
    fn test_affix_cross_product() {
        let config = CheckConfig::default()
            .with_prefixes(strings(&["get"]))
            .with_suffixes(strings(&["ly"]))
            .with_tlds(strings(&["io"]));
        let out = Composer::new(&config).compile(&["cloud"]).unwrap();
        assert_eq!(
            out.domains,
            vec!["cloud.io", "getcloud.io", "getcloudly.io", "cloudly.io"]
        );
    }

    #[test]
    fn test_invalid_tld_warns_and_falls_back() {
        let config = CheckConfig::default().with_tlds(strings(&["notarealtld"]));
        let out = Composer::new(&config).compile(&["x1"]).unwrap();
        assert_eq!(out.domains, vec!["x1.com"]);
        assert_eq!(
            out.warnings,
            vec![ComposeWarning::InvalidTld("notarealtld".to_string())]
        );
    }

    #[test]
    fn test_discovered_tlds_are_merged() {
        let config = CheckConfig::default().with_tlds(strings(&["io"]));
        let out = Composer::new(&config)
            .compile(&["google.com", "google.co.uk"])
            .unwrap();
        assert_eq!(out.tlds, vec!["io", "com", "co.uk"]);
        assert_eq!(out.domains, vec!["google.io", "google.com", "google.co.uk"]);
        assert_eq!(out.keywords, vec!["google"]);
    }

    #[test]
    fn test_preset_and_missing_preset() {
        let config = CheckConfig::default().with_preset("security");
        let out = Composer::new(&config).compile(&["vault"]).unwrap();
        assert_eq!(out.domains.len(), 4);
        assert!(out.domains.contains(&"vault.trust".to_string()));

        let config = CheckConfig::default().with_preset("nonexistent");
        let out = Composer::new(&config).compile(&["vault"]).unwrap();
        assert_eq!(out.domains, vec!["vault.com"]);
        assert_eq!(
            out.warnings,
            vec![ComposeWarning::PresetNotFound("nonexistent".to_string())]
        );
    }

    #[test]
    fn test_no_duplicates_and_length_bound() {
        let config = CheckConfig::default()
            .with_tlds(strings(&["com", "COM", ".com", "technology"]))
            .with_prefixes(strings(&["", "my"]))
            .with_max_domain_length(Some(10));
        let out = Composer::new(&config).compile(&["abc", "abc"]).unwrap();

        let unique: HashSet<_> = out.domains.iter().collect();
        assert_eq!(unique.len(), out.domains.len());
        assert!(out.domains.iter().all(|d| d.len() <= 10));
        assert!(out.domains.contains(&"myabc.com".to_string()));
        assert!(!out.domains.iter().any(|d| d.ends_with(".technology")));
    }

    #[test]
    fn test_pattern_mode_expands() {
        let config = CheckConfig::default().with_regex(true);
        let out = Composer::new(&config).compile(&["go[ab]{2}"]).unwrap();
        assert_eq!(
            out.domains,
            vec!["goaa.com", "goab.com", "goba.com", "gobb.com"]
        );
        assert_eq!(out.keywords, vec!["goaa", "goab", "goba", "gobb"]);
    }

    #[test]
    fn test_unsafe_pattern_contributes_nothing() {
        let config = CheckConfig::default().with_regex(true);
        let out = Composer::new(&config)
            .compile(&["[a-z]{4}", "plain"])
            .unwrap();
        assert_eq!(out.domains, vec!["plain.com"]);
        assert_eq!(
            out.warnings,
            vec![ComposeWarning::UnsafePattern {
                pattern: "[a-z]{4}".to_string(),
                combinations: 456_976,
                limit: 100_000,
            }]
        );
    }

    #[test]
    fn test_pattern_syntax_error_policy() {
        let config = CheckConfig::default().with_regex(true);
        let err = Composer::new(&config).compile(&["[ab", "ok"]).unwrap_err();
        assert!(matches!(err, DomainCheckError::InvalidPattern { .. }));

        let config = config.with_pattern_errors(PatternErrorPolicy::Skip);
        let out = Composer::new(&config).compile(&["[ab", "ok"]).unwrap();
        assert_eq!(out.domains, vec!["ok.com"]);
        assert!(matches!(
            out.warnings.as_slice(),
            [ComposeWarning::PatternSyntax { .. }]
        ));
    }

    #[test]
    fn test_patterns_ignored_without_regex_mode() {
        let config = CheckConfig::default();
        let out = Composer::new(&config).compile(&["[ab]"]).unwrap();
        assert!(out.domains.is_empty());
    }

    #[test]
    fn test_user_preset_override() {
        let mut store = tld_store(&Default::default());
        store.set_override("popular", strings(&["dev"]));
        let config = CheckConfig::default().with_preset("popular");
        let out = Composer::with_presets(&config, store).compile(&["x9"]).unwrap();
        assert_eq!(out.domains, vec!["x9.dev"]);
    }
}
