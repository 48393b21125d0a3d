//! Test utilities: mock implementations of the consumed interfaces.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::mpsc;

use crate::cache::MokaCache;
use crate::cycle::{CycleEvent, CycleReporter};
use crate::error::AppError;
use crate::models::{DiscoveredOracle, JobListing, JobsPage, PageRequest};
use crate::scheduler::Ticker;
use crate::traits::{Authenticator, ExchangeClient, KeyValueCache, OracleSource};

// ---------------------------------------------------------------------------
// MockOracleSource
// ---------------------------------------------------------------------------

/// Registry mock with a fixed answer per chain.
#[derive(Clone, Default)]
pub struct MockOracleSource {
    oracles: Arc<Mutex<HashMap<u64, Vec<DiscoveredOracle>>>>,
    errors: Arc<Mutex<HashMap<u64, AppError>>>,
    calls: Arc<Mutex<Vec<u64>>>,
}

impl MockOracleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(self, chain_id: u64, oracles: Vec<DiscoveredOracle>) -> Self {
        self.oracles.lock().unwrap().insert(chain_id, oracles);
        self
    }

    /// The next lookup for `chain_id` fails with `error`.
    pub fn with_chain_error(self, chain_id: u64, error: AppError) -> Self {
        self.errors.lock().unwrap().insert(chain_id, error);
        self
    }

    /// Chain ids looked up so far, in call order.
    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl OracleSource for MockOracleSource {
    async fn list_oracles(&self, chain_id: u64) -> Result<Vec<DiscoveredOracle>, AppError> {
        self.calls.lock().unwrap().push(chain_id);
        if let Some(e) = self.errors.lock().unwrap().remove(&chain_id) {
            return Err(e);
        }
        Ok(self
            .oracles
            .lock()
            .unwrap()
            .get(&chain_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockAuthenticator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockAuthenticator {
    token: String,
    /// Scripted answers, consumed before falling back to `token`.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    sign_ins: Arc<AtomicUsize>,
}

impl MockAuthenticator {
    /// Always hands out `token`.
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            responses: Arc::new(Mutex::new(Vec::new())),
            sign_ins: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails the first sign-in, then hands out `"token"`.
    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        let auth = Self::new("token");
        *auth.responses.lock().unwrap() = responses;
        auth
    }

    pub fn sign_in_count(&self) -> usize {
        self.sign_ins.load(Ordering::SeqCst)
    }
}

impl Authenticator for MockAuthenticator {
    async fn sign_in(&self) -> Result<String, AppError> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.token.clone())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockExchangeClient
// ---------------------------------------------------------------------------

/// Recorded page request: (base_url, page, token).
pub type PageCall = (String, u32, String);

/// Exchange oracle mock serving scripted pages per base URL.
#[derive(Clone, Default)]
pub struct MockExchangeClient {
    pages: Arc<Mutex<HashMap<(String, u32), JobsPage>>>,
    errors: Arc<Mutex<HashMap<(String, u32), AppError>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<PageCall>>>,
}

impl MockExchangeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pages` (page 0 first) for `base_url`, each reporting
    /// `pages.len()` total pages.
    pub fn with_catalog(self, base_url: &str, pages: Vec<Vec<JobListing>>) -> Self {
        let total_pages = pages.len() as u32;
        {
            let mut map = self.pages.lock().unwrap();
            for (page, results) in pages.into_iter().enumerate() {
                map.insert(
                    (base_url.to_string(), page as u32),
                    JobsPage {
                        results,
                        total_pages,
                    },
                );
            }
        }
        self
    }

    /// Every request for `page` of `base_url` fails with `error`.
    pub fn with_page_error(self, base_url: &str, page: u32, error: AppError) -> Self {
        self.errors
            .lock()
            .unwrap()
            .insert((base_url.to_string(), page), error);
        self
    }

    /// Hold every request for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn pages_requested(&self, base_url: &str) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _, _)| url == base_url)
            .map(|(_, page, _)| *page)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ExchangeClient for MockExchangeClient {
    async fn fetch_jobs(
        &self,
        base_url: &str,
        request: PageRequest,
        token: &str,
    ) -> Result<JobsPage, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((base_url.to_string(), request.page, token.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = (base_url.to_string(), request.page);
        if let Some(e) = self.errors.lock().unwrap().get(&key) {
            return Err(clone_error(e));
        }
        self.pages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {base_url}")))
    }
}

fn clone_error(error: &AppError) -> AppError {
    match error {
        AppError::Timeout(secs) => AppError::Timeout(*secs),
        AppError::NetworkError(msg) => AppError::NetworkError(msg.clone()),
        AppError::MalformedResponse { oracle, message } => AppError::MalformedResponse {
            oracle: oracle.clone(),
            message: message.clone(),
        },
        other => AppError::HttpError(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// MockCache
// ---------------------------------------------------------------------------

/// In-memory cache whose writes can be switched to fail.
#[derive(Clone)]
pub struct MockCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: MokaCache<V>,
    reject_writes: Arc<AtomicBool>,
}

impl<V> MockCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: MokaCache::new(),
            reject_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Every later `set` fails with `AppError::CacheError`; reads keep working.
    pub fn reject_writes(&self) {
        self.reject_writes.store(true, Ordering::SeqCst);
    }
}

impl<V> KeyValueCache<V> for MockCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, AppError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<(), AppError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::CacheError(format!("write to '{key}' rejected")));
        }
        self.inner.set(key, value, ttl).await
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Cycle reporter that records event labels.
#[derive(Default, Clone)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CycleReporter for MockReporter {
    fn report(&self, event: CycleEvent<'_>) {
        let label = match &event {
            CycleEvent::CycleStarted { .. } => "CycleStarted".to_string(),
            CycleEvent::AlreadyRunning => "AlreadyRunning".to_string(),
            CycleEvent::AuthenticationFailed { .. } => "AuthenticationFailed".to_string(),
            CycleEvent::NoOracles => "NoOracles".to_string(),
            CycleEvent::OracleSkipped { oracle } => format!("OracleSkipped:{}", oracle.address),
            CycleEvent::OracleCrawled { oracle, .. } => {
                format!("OracleCrawled:{}", oracle.address)
            }
            CycleEvent::OracleFailed { oracle, .. } => format!("OracleFailed:{}", oracle.address),
            CycleEvent::PersistFailed { oracle, .. } => format!("PersistFailed:{oracle}"),
            CycleEvent::CycleCompleted { .. } => "CycleCompleted".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// ManualTicker
// ---------------------------------------------------------------------------

/// Ticker fired by hand through the returned sender.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }
}

impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

pub fn make_discovered(address: &str, url: &str) -> DiscoveredOracle {
    DiscoveredOracle {
        address: address.to_string(),
        role: "exchange_oracle".to_string(),
        url: Some(url.to_string()),
        job_types: vec!["fortune".to_string()],
    }
}

/// Reference instant for listing timestamps.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// A listing created `minutes` minutes after [`base_time`].
pub fn make_listing(escrow_address: &str, chain_id: u64, minutes: i64) -> JobListing {
    let created_at = base_time() + TimeDelta::minutes(minutes);
    JobListing {
        escrow_address: escrow_address.to_string(),
        chain_id,
        job_type: "fortune".to_string(),
        status: "active".to_string(),
        job_description: Some(format!("job {escrow_address}")),
        reward_amount: Some("10".to_string()),
        reward_token: Some("HMT".to_string()),
        created_at,
        updated_at: Some(created_at),
        qualifications: None,
    }
}

/// `count` distinct listings, `escrow-{i}` created `i` minutes apart.
pub fn make_listings(count: usize, chain_id: u64) -> Vec<JobListing> {
    (0..count)
        .map(|i| make_listing(&format!("escrow-{i}"), chain_id, i as i64))
        .collect()
}
