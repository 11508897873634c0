//! Run orchestration: compose candidates, resolve them concurrently and
//! forward each result to a sink as it completes.

use crate::checker::DomainChecker;
use crate::composer::{ComposeWarning, Composer, Composition};
use crate::concurrent::ConcurrentProcessor;
use crate::error::DomainCheckError;
use crate::types::{CheckConfig, DomainResult};
use futures::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Destination for results. Implementations may print immediately or
/// buffer until [`ResultSink::flush`].
pub trait ResultSink: Send {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError>;

    /// Called once after the last result.
    fn flush(&mut self) -> Result<(), DomainCheckError> {
        Ok(())
    }
}

/// Collects results in memory.
impl ResultSink for Vec<DomainResult> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        self.push(result.clone());
        Ok(())
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub available: usize,
    pub taken: usize,
    pub timed_out: usize,
    /// Unknown status, cancellations and every other failure
    pub errored: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn record(&mut self, result: &DomainResult) {
        self.total += 1;
        match &result.error {
            Some(_) if result.timed_out() => self.timed_out += 1,
            Some(_) => self.errored += 1,
            None if result.available => self.available += 1,
            None => self.taken += 1,
        }
    }
}

/// What a finished run produced besides the streamed results.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub warnings: Vec<ComposeWarning>,
    pub tlds: Vec<String>,
    pub stats: RunStats,
    /// True when shutdown was requested before the run finished
    pub interrupted: bool,
}

/// Whether a result should reach the user under the given filters.
///
/// With `only_available`, taken domains are hidden and errors only show
/// in verbose mode.
pub fn is_displayed(result: &DomainResult, config: &CheckConfig) -> bool {
    if !config.only_available {
        return true;
    }
    match result.error {
        Some(_) => config.verbose,
        None => result.available,
    }
}

/// Wires the composer into the concurrency engine.
///
/// # Example
///
/// ```rust,no_run
/// use tldx_lib::{CheckConfig, DomainResult, Exec};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CheckConfig::default().with_tlds(vec!["com".into(), "io".into()]);
///     let mut results: Vec<DomainResult> = Vec::new();
///     let report = Exec::new(config).run(&["tldx"], &mut results).await?;
///     println!("{} available", report.stats.available);
///     Ok(())
/// }
/// ```
pub struct Exec {
    config: CheckConfig,
    shutdown: CancellationToken,
}

impl Exec {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use an externally owned shutdown token (e.g. tied to Ctrl-C).
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Compose candidates without resolving them. Warnings are returned,
    /// not printed.
    pub fn compose<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Composition, DomainCheckError> {
        let composition = Composer::new(&self.config).compile(inputs)?;
        for warning in &composition.warnings {
            debug!(%warning, "composition warning");
        }
        Ok(composition)
    }

    /// Compose, then resolve through the default RDAP, DNS and WHOIS chain.
    pub async fn run<S: AsRef<str>>(
        &self,
        inputs: &[S],
        sink: &mut dyn ResultSink,
    ) -> Result<RunReport, DomainCheckError> {
        let checker = DomainChecker::with_config(self.config.clone())?;
        self.run_with(checker, inputs, sink).await
    }

    /// Compose, then resolve with `checker`.
    pub async fn run_with<S: AsRef<str>>(
        &self,
        checker: DomainChecker,
        inputs: &[S],
        sink: &mut dyn ResultSink,
    ) -> Result<RunReport, DomainCheckError> {
        let Composition {
            domains,
            warnings,
            tlds,
            ..
        } = self.compose(inputs)?;

        let stats = self.resolve(checker, domains, sink).await?;
        Ok(RunReport {
            warnings,
            tlds,
            stats,
            interrupted: self.shutdown.is_cancelled(),
        })
    }

    /// Resolve an already composed candidate list.
    ///
    /// Every result is counted; only those passing [`is_displayed`] reach
    /// the sink. The sink is flushed even after an interrupt.
    pub async fn resolve(
        &self,
        checker: DomainChecker,
        domains: Vec<String>,
        sink: &mut dyn ResultSink,
    ) -> Result<RunStats, DomainCheckError> {
        let started = Instant::now();
        let limit = self.config.effective_concurrency();
        info!(candidates = domains.len(), concurrency = limit, "starting checks");

        let checker = checker.with_shutdown(self.shutdown.clone());
        let mut results = Box::pin(ConcurrentProcessor::new(checker, limit).stream(domains));

        let mut stats = RunStats::default();
        while let Some(result) = results.next().await {
            stats.record(&result);
            if is_displayed(&result, &self.config) {
                sink.write(&result)?;
            }
        }
        sink.flush()?;

        stats.elapsed = started.elapsed();
        debug!(?stats, "run finished");
        Ok(stats)
    }
}

/// Read keywords from a file: one per line, blank lines and `#` comments
/// skipped.
pub fn read_keywords_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, DomainCheckError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| DomainCheckError::file_error(path.display().to_string(), e.to_string()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckMethod, CheckResult};
    use std::io::Write;

    fn ok(domain: &str, registered: bool) -> DomainResult {
        let check = if registered {
            CheckResult::registered(CheckMethod::Rdap, "taken")
        } else {
            CheckResult::not_registered(CheckMethod::Rdap, "free")
        };
        DomainResult::from_check(domain, check)
    }

    #[test]
    fn test_stats_buckets() {
        let mut stats = RunStats::default();
        stats.record(&ok("a.com", false));
        stats.record(&ok("b.com", true));
        stats.record(&DomainResult::from_error(
            "c.com",
            DomainCheckError::timeout("check c.com", Duration::from_secs(1)),
        ));
        stats.record(&DomainResult::from_error(
            "d.com",
            DomainCheckError::unknown_status("d.com", DomainCheckError::dns("d.com", "none")),
        ));

        assert_eq!(
            stats,
            RunStats {
                total: 4,
                available: 1,
                taken: 1,
                timed_out: 1,
                errored: 1,
                elapsed: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_only_available_filter() {
        let config = CheckConfig {
            only_available: true,
            ..CheckConfig::default()
        };
        let failed = DomainResult::from_error("x.com", DomainCheckError::cancelled("check x.com"));

        assert!(is_displayed(&ok("a.com", false), &config));
        assert!(!is_displayed(&ok("b.com", true), &config));
        assert!(!is_displayed(&failed, &config));

        let verbose = CheckConfig {
            verbose: true,
            ..config
        };
        assert!(is_displayed(&failed, &verbose));
        assert!(is_displayed(&ok("b.com", true), &CheckConfig::default()));
    }

    #[test]
    fn test_read_keywords_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# brainstorm").unwrap();
        writeln!(file, "rocket").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  launch  ").unwrap();

        let keywords = read_keywords_file(file.path()).unwrap();
        assert_eq!(keywords, vec!["rocket", "launch"]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_keywords_file("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, DomainCheckError::FileError { .. }));
    }

    #[test]
    fn test_compose_only() {
        let exec = Exec::new(CheckConfig::default().with_tlds(vec!["io".to_string()]));
        let composition = exec.compose(&["rocket"]).unwrap();
        assert_eq!(composition.domains, vec!["rocket.io"]);
    }
}
