use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{DiscoveredOracle, JobsPage, PageRequest};

/// Lists the exchange oracles registered on a chain.
pub trait OracleSource: Send + Sync + Clone {
    fn list_oracles(
        &self,
        chain_id: u64,
    ) -> impl Future<Output = Result<Vec<DiscoveredOracle>, AppError>> + Send;
}

/// Produces a bearer token for the crawler's service identity.
pub trait Authenticator: Send + Sync + Clone {
    fn sign_in(&self) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Fetches one page of an exchange oracle's job catalog.
pub trait ExchangeClient: Send + Sync + Clone {
    fn fetch_jobs(
        &self,
        base_url: &str,
        request: PageRequest,
        token: &str,
    ) -> impl Future<Output = Result<JobsPage, AppError>> + Send;
}

/// Generic keyed store shared by oracle discovery (with TTL) and job
/// catalogs (without TTL).
pub trait KeyValueCache<V>: Send + Sync + Clone
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<V>, AppError>> + Send;

    /// Store `value` under `key`. `ttl: None` keeps the entry until it is
    /// overwritten.
    fn set(
        &self,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
