//! End-to-end behaviour of the public API, driven with scripted lookup
//! adapters so nothing touches the network.

use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tldx_lib::pattern::{expand_pattern, is_pattern_safe};
use tldx_lib::presets::{resolve_tld_preset, ALL_PRESET};
use tldx_lib::validate::{is_valid_domain_or_keyword, validate_keywords};
use tldx_lib::{
    tld_store, CheckConfig, CheckMethod, CheckResult, ComposeWarning, Composer, DomainCheckError,
    DomainChecker, DomainResult, Exec, Lookup, PatternErrorPolicy, ResultSink,
};
use tokio_util::sync::CancellationToken;

/// Registered when the second-level label starts with "taken".
struct ByName {
    method: CheckMethod,
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ByName {
    fn new(delay: Duration) -> Self {
        Self {
            method: CheckMethod::Rdap,
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Lookup for ByName {
    fn method(&self) -> CheckMethod {
        self.method
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if domain.starts_with("taken") {
                Ok(CheckResult::registered(self.method, "RDAP registered"))
            } else {
                Ok(CheckResult::not_registered(self.method, "RDAP object does not exist"))
            }
        })
    }

    fn falls_through(&self, _err: &DomainCheckError) -> bool {
        false
    }
}

/// Always fails with the error built by `make`.
struct Broken {
    method: CheckMethod,
    make: fn(&str) -> DomainCheckError,
}

impl Lookup for Broken {
    fn method(&self) -> CheckMethod {
        self.method
    }

    fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
        let err = (self.make)(domain);
        Box::pin(async move { Err(err) })
    }

    fn falls_through(&self, _err: &DomainCheckError) -> bool {
        true
    }

    fn retried(&self) -> bool {
        false
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_bare_keywords_default_to_com() {
    let config = CheckConfig::default();
    let composition = Composer::new(&config)
        .compile(&["rocket", "launch", "orbit"])
        .unwrap();
    assert_eq!(
        composition.domains,
        vec!["rocket.com", "launch.com", "orbit.com"]
    );
    assert!(composition.warnings.is_empty());
}

#[test]
fn test_composition_is_unique_and_bounded() {
    let config = CheckConfig::default()
        .with_prefixes(strings(&["get", "my"]))
        .with_suffixes(strings(&["hq", "ly"]))
        .with_tlds(strings(&["com", "io", "com"]))
        .with_max_domain_length(Some(10));

    let composition = Composer::new(&config)
        .compile(&["app", "app", "platform"])
        .unwrap();

    let unique: HashSet<&String> = composition.domains.iter().collect();
    assert_eq!(unique.len(), composition.domains.len());
    assert!(composition.domains.iter().all(|d| d.len() <= 10));
    assert!(composition.domains.contains(&"getapp.io".to_string()));
    assert!(!composition.domains.iter().any(|d| d.starts_with("platform")));
    assert_eq!(composition.tlds, vec!["com", "io"]);
}

#[test]
fn test_pattern_properties() {
    assert_eq!(expand_pattern("[ab]{2}").unwrap(), vec!["aa", "ab", "ba", "bb"]);
    assert_eq!(is_pattern_safe("[a-z]{4}", 100_000).unwrap(), (false, 456_976));

    let config = CheckConfig::default().with_regex(true);
    let composition = Composer::new(&config).compile(&["[a-z]{4}"]).unwrap();
    assert!(composition.domains.is_empty());
    assert!(matches!(
        composition.warnings.as_slice(),
        [ComposeWarning::UnsafePattern { combinations: 456_976, .. }]
    ));
}

#[test]
fn test_pattern_syntax_policy() {
    let abort = CheckConfig::default().with_regex(true);
    assert!(Composer::new(&abort).compile(&["go[ab", "fine"]).is_err());

    let skip = abort.with_pattern_errors(PatternErrorPolicy::Skip);
    let composition = Composer::new(&skip).compile(&["go[ab", "fine"]).unwrap();
    assert_eq!(composition.domains, vec!["fine.com"]);
    assert!(matches!(
        composition.warnings.as_slice(),
        [ComposeWarning::PatternSyntax { .. }]
    ));
}

#[test]
fn test_validation_properties() {
    assert!(is_valid_domain_or_keyword("exa.mple"));
    assert!(!is_valid_domain_or_keyword("-start"));
    assert!(!is_valid_domain_or_keyword("end-"));
    assert!(!is_valid_domain_or_keyword("under_score"));
    assert!(!is_valid_domain_or_keyword(&"a".repeat(64)));

    let validated = validate_keywords(&["google.com", "google.co.uk"]);
    assert_eq!(validated.keywords, vec!["google"]);
    let tlds: HashSet<_> = validated.discovered_tlds.into_iter().collect();
    assert_eq!(tlds, HashSet::from(["com".to_string(), "co.uk".to_string()]));
}

#[test]
fn test_preset_override_and_all() {
    let custom = [("popular".to_string(), strings(&["zz", "io"]))]
        .into_iter()
        .collect();
    let store = tld_store(&custom);

    assert_eq!(store.get("popular"), Some(&strings(&["zz", "io"])));
    let all = store.all();
    assert_eq!(all.keys().filter(|k| *k == "popular").count(), 1);
    assert_eq!(all["popular"], strings(&["zz", "io"]));

    let everything = resolve_tld_preset(&store, ALL_PRESET).unwrap();
    assert!(everything.contains(&"zz".to_string()));
    assert!(resolve_tld_preset(&store, "no-such-preset").is_none());
}

#[tokio::test]
async fn test_exhausted_chain_reports_unknown_status() {
    let config = CheckConfig::default().with_retries(0);
    let checker = DomainChecker::with_chain(
        vec![
            Box::new(Broken {
                method: CheckMethod::Rdap,
                make: |d| DomainCheckError::bootstrap(d, "no RDAP service"),
            }),
            Box::new(Broken {
                method: CheckMethod::Dns,
                make: |d| DomainCheckError::dns(d, "no records"),
            }),
            Box::new(Broken {
                method: CheckMethod::Whois,
                make: |_| DomainCheckError::network("connection refused"),
            }),
        ],
        &config,
    );

    let result = checker.check("mystery.zz").await;
    assert!(!result.is_available());
    assert!(result.details.contains("unknown status"));
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_nanosecond_deadline_does_not_hang() {
    let config = CheckConfig::default().with_timeout(Duration::from_nanos(1));
    let checker = DomainChecker::with_chain(
        vec![Box::new(ByName::new(Duration::from_secs(60)))],
        &config,
    );

    let result = tokio::time::timeout(Duration::from_secs(5), checker.check("slow.com"))
        .await
        .expect("check should finish under its own deadline");
    assert!(result.timed_out());
}

#[tokio::test(start_paused = true)]
async fn test_run_respects_concurrency_limit() {
    let lookup = ByName::new(Duration::from_millis(25));
    let peak = lookup.peak.clone();
    let config = CheckConfig::default()
        .with_concurrency(3)
        .with_tlds(strings(&["com", "net", "org", "io"]));
    let checker = DomainChecker::with_chain(vec![Box::new(lookup)], &config);

    let mut results: Vec<DomainResult> = Vec::new();
    let report = Exec::new(config)
        .run_with(checker, &["taken", "alpha", "beta"], &mut results)
        .await
        .unwrap();

    assert_eq!(results.len(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(report.stats.total, 12);
    assert_eq!(report.stats.taken, 4);
    assert_eq!(report.stats.available, 8);
    assert!(!report.interrupted);
}

#[tokio::test(start_paused = true)]
async fn test_only_available_hides_taken_but_counts_them() {
    let config = CheckConfig {
        only_available: true,
        ..CheckConfig::default()
    };
    let checker = DomainChecker::with_chain(
        vec![Box::new(ByName::new(Duration::from_millis(1)))],
        &config,
    );

    let mut results: Vec<DomainResult> = Vec::new();
    let report = Exec::new(config)
        .run_with(checker, &["taken", "free"], &mut results)
        .await
        .unwrap();

    assert_eq!(report.stats.total, 2);
    assert_eq!(
        results.iter().map(|r| r.domain.as_str()).collect::<Vec<_>>(),
        vec!["free.com"]
    );
}

/// Counts flushes to check the sink lifecycle.
#[derive(Default)]
struct CountingSink {
    written: usize,
    flushed: usize,
}

impl ResultSink for CountingSink {
    fn write(&mut self, _result: &DomainResult) -> Result<(), DomainCheckError> {
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        self.flushed += 1;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_run_still_reports_every_domain() {
    let config = CheckConfig::default()
        .with_concurrency(1)
        .with_tlds(strings(&["com", "net", "org", "io", "dev"]));
    let checker = DomainChecker::with_chain(
        vec![Box::new(ByName::new(Duration::from_millis(100)))],
        &config,
    );
    let token = CancellationToken::new();
    token.cancel();

    let mut sink = CountingSink::default();
    let report = Exec::new(config)
        .with_shutdown(token)
        .run_with(checker, &["rocket"], &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.written, 5);
    assert_eq!(sink.flushed, 1);
    assert_eq!(report.stats.errored, 5);
    assert!(report.interrupted);
}

#[test]
fn test_blocking_compose_through_exec() {
    let exec = Exec::new(CheckConfig::default().with_preset("nope"));
    let composition = tokio_test::block_on(async { exec.compose(&["idea"]) }).unwrap();
    assert_eq!(composition.domains, vec!["idea.com"]);
    assert_eq!(
        composition.warnings,
        vec![ComposeWarning::PresetNotFound("nope".to_string())]
    );
}
