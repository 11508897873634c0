//! Bounded, streaming concurrency engine.
//!
//! At most `limit` domains are in flight at once: the producer takes a
//! semaphore permit before spawning each worker and the worker holds it
//! until its result has been handed to the channel. Results arrive in
//! completion order, one per input domain.

use crate::checker::DomainChecker;
use crate::error::DomainCheckError;
use crate::types::DomainResult;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fans domains out over a bounded pool of workers.
pub struct ConcurrentProcessor {
    checker: DomainChecker,
    limit: usize,
    shutdown: CancellationToken,
}

impl ConcurrentProcessor {
    /// `limit` is clamped to at least one worker.
    pub fn new(checker: DomainChecker, limit: usize) -> Self {
        let shutdown = checker.shutdown_token().clone();
        Self {
            checker,
            limit: limit.max(1),
            shutdown,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Check every domain and stream the results as they complete.
    ///
    /// The stream yields exactly `domains.len()` items and then ends.
    /// After shutdown no new workers start; each domain not yet dispatched
    /// is reported with a `Cancelled` error instead. Workers already running
    /// finish under their own deadline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn stream(self, domains: Vec<String>) -> impl Stream<Item = DomainResult> + Send + 'static {
        let (tx, rx) = mpsc::channel::<DomainResult>(self.limit);
        let permits = Arc::new(Semaphore::new(self.limit));
        let Self {
            checker,
            limit,
            shutdown,
        } = self;

        tokio::spawn(async move {
            debug!(domains = domains.len(), limit, "dispatching checks");
            let mut pending = domains.into_iter();

            while let Some(domain) = pending.next() {
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => None,
                    permit = permits.clone().acquire_owned() => permit.ok(),
                };
                let Some(permit) = permit else {
                    report_cancelled(&tx, std::iter::once(domain).chain(pending.by_ref())).await;
                    break;
                };

                let checker = checker.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = checker.check(&domain).await;
                    // The receiver may be gone if the caller stopped listening.
                    let _ = tx.send(result).await;
                    drop(permit);
                });
            }
        });

        stream::unfold(rx, |mut rx| async move {
            let next = rx.recv().await?;
            Some((next, rx))
        })
    }
}

async fn report_cancelled<I>(tx: &mpsc::Sender<DomainResult>, domains: I)
where
    I: Iterator<Item = String>,
{
    let mut skipped = 0usize;
    for domain in domains {
        let err = DomainCheckError::cancelled(format!("check {}", domain));
        if tx.send(DomainResult::from_error(domain, err)).await.is_err() {
            return;
        }
        skipped += 1;
    }
    debug!(skipped, "shutdown requested, remaining domains not dispatched");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::Lookup;
    use crate::types::{CheckConfig, CheckMethod, CheckResult};
    use futures::future::BoxFuture;
    use futures::StreamExt;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many lookups overlap.
    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    struct Instrumented {
        gauge: Arc<Gauge>,
        delay: Duration,
    }

    impl Lookup for Instrumented {
        fn method(&self) -> CheckMethod {
            CheckMethod::Rdap
        }

        fn lookup<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<CheckResult, DomainCheckError>> {
            Box::pin(async move {
                let now = self.gauge.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.gauge.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.gauge.active.fetch_sub(1, Ordering::SeqCst);
                Ok(CheckResult::registered(
                    CheckMethod::Rdap,
                    format!("{} taken", domain),
                ))
            })
        }

        fn falls_through(&self, _err: &DomainCheckError) -> bool {
            false
        }
    }

    fn processor(gauge: Arc<Gauge>, delay: Duration, limit: usize) -> ConcurrentProcessor {
        let config = CheckConfig::default().with_timeout(Duration::from_secs(30));
        let checker =
            DomainChecker::with_chain(vec![Box::new(Instrumented { gauge, delay })], &config);
        ConcurrentProcessor::new(checker, limit)
    }

    fn domains(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("name{}.com", i)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let gauge = Arc::new(Gauge::default());
        let results: Vec<_> = processor(gauge.clone(), Duration::from_millis(20), 4)
            .stream(domains(25))
            .collect()
            .await;

        assert_eq!(results.len(), 25);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {} exceeded limit", peak);
        assert!(peak >= 2, "workers never overlapped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_result_per_domain() {
        let gauge = Arc::new(Gauge::default());
        let input = domains(10);
        let seen: HashSet<String> = processor(gauge, Duration::from_millis(5), 3)
            .stream(input.clone())
            .map(|r| r.domain)
            .collect()
            .await;

        assert_eq!(seen, input.into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_empty_input_ends_stream() {
        let gauge = Arc::new(Gauge::default());
        let results: Vec<_> = processor(gauge, Duration::from_millis(1), 2)
            .stream(Vec::new())
            .collect()
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_undispatched_domains() {
        let gauge = Arc::new(Gauge::default());
        let engine = processor(gauge, Duration::from_secs(1), 2);
        let token = engine.shutdown.clone();

        let mut stream = Box::pin(engine.stream(domains(8)));
        let first = stream.next().await;
        assert!(first.is_some());
        token.cancel();

        let mut rest: Vec<DomainResult> = stream.collect().await;
        rest.extend(first);
        assert_eq!(rest.len(), 8);
        assert!(rest
            .iter()
            .any(|r| matches!(r.error, Some(DomainCheckError::Cancelled { .. }))));
        assert!(rest.iter().all(|r| !r.is_available()));
    }

    #[test]
    fn test_limit_clamped() {
        let config = CheckConfig::default();
        let checker = DomainChecker::with_chain(Vec::new(), &config);
        assert_eq!(ConcurrentProcessor::new(checker, 0).limit(), 1);
    }
}
