use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backoff::{BackoffPolicy, BackoffState};
use crate::crawler::Crawler;
use crate::directory::OracleDirectory;
use crate::error::AppError;
use crate::merge::{MergeCache, MergeOutcome};
use crate::models::{JobListing, OracleRecord};
use crate::scheduler::CycleRunner;
use crate::traits::{Authenticator, ExchangeClient, KeyValueCache, OracleSource};

/// Events emitted during a crawl cycle for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CycleEvent<'a> {
    CycleStarted {
        cycle_id: Uuid,
    },
    /// A tick arrived while another cycle still held the writer lock.
    AlreadyRunning,
    AuthenticationFailed {
        error: &'a AppError,
    },
    NoOracles,
    /// The oracle sat this cycle out; `oracle` carries the decremented count.
    OracleSkipped {
        oracle: &'a OracleRecord,
    },
    OracleCrawled {
        oracle: &'a OracleRecord,
        fetched: usize,
        merge: MergeOutcome,
    },
    OracleFailed {
        oracle: &'a OracleRecord,
        error: &'a AppError,
    },
    PersistFailed {
        oracle: &'a str,
        error: &'a AppError,
    },
    CycleCompleted {
        cycle_id: Uuid,
        summary: &'a CycleSummary,
    },
}

/// Trait for receiving cycle events (decoupled logging).
pub trait CycleReporter: Send + Sync {
    fn report(&self, event: CycleEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCycleReporter;

impl CycleReporter for TracingCycleReporter {
    fn report(&self, event: CycleEvent<'_>) {
        match event {
            CycleEvent::CycleStarted { cycle_id } => {
                tracing::info!(%cycle_id, "Update jobs list started");
            }
            CycleEvent::AlreadyRunning => {
                tracing::warn!("Previous cycle still running, skipping tick");
            }
            CycleEvent::AuthenticationFailed { error } => {
                tracing::error!(%error, "Sign-in failed, aborting cycle");
            }
            CycleEvent::NoOracles => {
                tracing::info!("No oracles discovered, nothing to crawl");
            }
            CycleEvent::OracleSkipped { oracle } => {
                tracing::info!(
                    oracle = %oracle.address,
                    chain_id = oracle.chain_id,
                    skip_cycles = oracle.skip_cycles_remaining,
                    "Skipping jobs list update for oracle"
                );
            }
            CycleEvent::OracleCrawled {
                oracle,
                fetched,
                merge,
            } => {
                tracing::info!(
                    oracle = %oracle.address,
                    chain_id = oracle.chain_id,
                    fetched,
                    inserted = merge.inserted,
                    replaced = merge.replaced,
                    total = merge.total,
                    "Jobs list updated"
                );
            }
            CycleEvent::OracleFailed { oracle, error } => {
                tracing::error!(
                    oracle = %oracle.address,
                    chain_id = oracle.chain_id,
                    %error,
                    retryable = error.is_retryable(),
                    consecutive_failures = oracle.consecutive_failures,
                    skip_cycles = oracle.skip_cycles_remaining,
                    "Error while updating jobs list for oracle"
                );
            }
            CycleEvent::PersistFailed { oracle, error } => {
                tracing::error!(%oracle, %error, "Failed to store oracle state");
            }
            CycleEvent::CycleCompleted { cycle_id, summary } => {
                tracing::info!(
                    %cycle_id,
                    crawled = summary.crawled,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Update jobs list finished"
                );
            }
        }
    }
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleSummary {
    pub crawled: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleSummary),
    AlreadyRunning,
    /// No token could be obtained; nothing was read or written.
    AuthenticationFailed,
    NoOracles,
}

/// Runs crawl cycles: sign in once, walk the discovered oracles one at a
/// time, merge what was fetched and record each oracle's backoff state.
///
/// Cycles and manual refreshes share one writer lock, so at most one of
/// them mutates oracle state or catalogs at any time.
pub struct CycleService<A, S, OC, X, JC>
where
    A: Authenticator,
    S: OracleSource,
    OC: KeyValueCache<Vec<OracleRecord>>,
    X: ExchangeClient,
    JC: KeyValueCache<Vec<JobListing>>,
{
    authenticator: A,
    directory: OracleDirectory<S, OC>,
    crawler: Crawler<X>,
    catalogs: MergeCache<JC>,
    policy: BackoffPolicy,
    writer: Arc<Mutex<()>>,
}

impl<A, S, OC, X, JC> CycleService<A, S, OC, X, JC>
where
    A: Authenticator,
    S: OracleSource,
    OC: KeyValueCache<Vec<OracleRecord>>,
    X: ExchangeClient,
    JC: KeyValueCache<Vec<JobListing>>,
{
    pub fn new(
        authenticator: A,
        directory: OracleDirectory<S, OC>,
        crawler: Crawler<X>,
        catalogs: MergeCache<JC>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            authenticator,
            directory,
            crawler,
            catalogs,
            policy,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn directory(&self) -> &OracleDirectory<S, OC> {
        &self.directory
    }

    pub fn catalogs(&self) -> &MergeCache<JC> {
        &self.catalogs
    }

    /// Run one crawl cycle over every discovered oracle.
    pub async fn run_cycle<R: CycleReporter>(&self, reporter: &R) -> CycleOutcome {
        let Ok(_writer) = self.writer.try_lock() else {
            reporter.report(CycleEvent::AlreadyRunning);
            return CycleOutcome::AlreadyRunning;
        };

        let cycle_id = Uuid::new_v4();
        reporter.report(CycleEvent::CycleStarted { cycle_id });

        let token = match self.authenticator.sign_in().await {
            Ok(token) => token,
            Err(error) => {
                reporter.report(CycleEvent::AuthenticationFailed { error: &error });
                return CycleOutcome::AuthenticationFailed;
            }
        };

        let oracles = self.directory.discover().await;
        if oracles.is_empty() {
            reporter.report(CycleEvent::NoOracles);
            return CycleOutcome::NoOracles;
        }

        let mut summary = CycleSummary::default();
        for oracle in oracles {
            if oracle.is_skipping() {
                self.skip(oracle, reporter).await;
                summary.skipped += 1;
                continue;
            }

            match self.crawl_and_record(oracle, &token, reporter).await {
                Ok(_) => summary.crawled += 1,
                Err(_) => summary.failed += 1,
            }
        }

        reporter.report(CycleEvent::CycleCompleted {
            cycle_id,
            summary: &summary,
        });
        CycleOutcome::Completed(summary)
    }

    /// Crawl one oracle right away, ignoring any remaining skip cycles.
    ///
    /// Waits for a running cycle to finish first. The crawl result updates
    /// the oracle's backoff state exactly as a scheduled crawl would.
    pub async fn refresh_oracle<R: CycleReporter>(
        &self,
        address: &str,
        reporter: &R,
    ) -> Result<MergeOutcome, AppError> {
        let _writer = self.writer.lock().await;

        let token = self.authenticator.sign_in().await.inspect_err(|error| {
            reporter.report(CycleEvent::AuthenticationFailed { error });
        })?;
        let oracle = self.directory.find(address).await?;

        self.crawl_and_record(oracle, &token, reporter).await
    }

    async fn skip<R: CycleReporter>(&self, mut oracle: OracleRecord, reporter: &R) {
        self.policy
            .on_skip(BackoffState::of(&oracle))
            .apply_to(&mut oracle);
        reporter.report(CycleEvent::OracleSkipped { oracle: &oracle });
        self.persist(oracle, reporter).await;
    }

    /// The previous catalog is left untouched unless both the crawl and the
    /// merge succeed.
    async fn crawl_and_record<R: CycleReporter>(
        &self,
        mut oracle: OracleRecord,
        token: &str,
        reporter: &R,
    ) -> Result<MergeOutcome, AppError> {
        let result = match self.crawler.crawl_one(&oracle, token).await {
            Ok(listings) => {
                let fetched = listings.len();
                self.catalogs
                    .merge(&oracle.address, listings)
                    .await
                    .map(|merge| (fetched, merge))
            }
            Err(e) => Err(e),
        };

        let state = BackoffState::of(&oracle);
        match result {
            Ok((fetched, merge)) => {
                self.policy.on_success(state).apply_to(&mut oracle);
                reporter.report(CycleEvent::OracleCrawled {
                    oracle: &oracle,
                    fetched,
                    merge,
                });
                self.persist(oracle, reporter).await;
                Ok(merge)
            }
            Err(error) => {
                self.policy.on_failure(state).apply_to(&mut oracle);
                reporter.report(CycleEvent::OracleFailed {
                    oracle: &oracle,
                    error: &error,
                });
                self.persist(oracle, reporter).await;
                Err(error)
            }
        }
    }

    async fn persist<R: CycleReporter>(&self, oracle: OracleRecord, reporter: &R) {
        let address = oracle.address.clone();
        if let Err(error) = self.directory.persist(oracle).await {
            reporter.report(CycleEvent::PersistFailed {
                oracle: &address,
                error: &error,
            });
        }
    }
}

impl<A, S, OC, X, JC> CycleRunner for CycleService<A, S, OC, X, JC>
where
    A: Authenticator,
    S: OracleSource,
    OC: KeyValueCache<Vec<OracleRecord>>,
    X: ExchangeClient,
    JC: KeyValueCache<Vec<JobListing>>,
{
    async fn run_cycle<R: CycleReporter>(&self, reporter: &R) -> CycleOutcome {
        CycleService::run_cycle(self, reporter).await
    }
}
