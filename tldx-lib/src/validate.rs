//! Keyword and domain validation.
//!
//! Syntax checks are pure and never touch the network. TLD knowledge comes
//! from the compiled-in Mozilla Public Suffix List.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref LABEL_RE: Regex =
        Regex::new(r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("static label regex");
}

/// Keywords and TLDs extracted from user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedKeywords {
    pub keywords: Vec<String>,
    /// Suffixes stripped from full-domain inputs, in first-seen order
    pub discovered_tlds: Vec<String>,
}

/// Check that every dot-separated label is a legal hostname label.
///
/// The overall length bound is applied later, at composition time.
pub fn is_valid_domain_or_keyword(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|label| LABEL_RE.is_match(label))
}

/// Look up the public suffix of `candidate`.
///
/// Returns the canonical (lowercase) suffix and whether it is a listed rule.
/// Names only matched by the implicit `*` rule come back as unknown.
pub fn public_suffix(candidate: &str) -> (String, bool) {
    let lowered = candidate.trim().trim_start_matches('.').to_ascii_lowercase();
    match psl::suffix(lowered.as_bytes()) {
        Some(suffix) => (
            String::from_utf8_lossy(suffix.as_bytes()).into_owned(),
            suffix.is_known(),
        ),
        None => (lowered, false),
    }
}

/// Validate a TLD candidate: it must itself be a listed public suffix.
///
/// Returns the canonical form when valid.
pub fn validate_tld(candidate: &str) -> Option<String> {
    let cleaned = candidate.trim().trim_start_matches('.').to_ascii_lowercase();
    if cleaned.is_empty() || !is_valid_domain_or_keyword(&cleaned) {
        return None;
    }
    let (suffix, known) = public_suffix(&cleaned);
    (known && suffix == cleaned).then_some(suffix)
}

/// Lowercase, dedupe and validate keywords, splitting full domains into
/// keyword plus TLD.
///
/// Invalid entries are dropped without a warning. An input that is nothing
/// but a public suffix (e.g. `co.uk`) yields no keyword.
pub fn validate_keywords<S: AsRef<str>>(inputs: &[S]) -> ValidatedKeywords {
    let mut seen_inputs = HashSet::new();
    let mut seen_keywords = HashSet::new();
    let mut seen_tlds = HashSet::new();
    let mut out = ValidatedKeywords::default();

    for raw in inputs {
        let entry = raw.as_ref().trim().to_ascii_lowercase();
        if !seen_inputs.insert(entry.clone()) || !is_valid_domain_or_keyword(&entry) {
            continue;
        }

        let keyword = if entry.contains('.') {
            let (suffix, _) = public_suffix(&entry);
            if seen_tlds.insert(suffix.clone()) {
                out.discovered_tlds.push(suffix.clone());
            }
            match entry.strip_suffix(suffix.as_str()) {
                Some(rest) => rest.trim_end_matches('.').to_string(),
                None => entry.clone(),
            }
        } else {
            entry
        };

        if !keyword.is_empty() && seen_keywords.insert(keyword.clone()) {
            out.keywords.push(keyword);
        }
    }

    out
}
