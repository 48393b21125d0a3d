use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::{DiscoveredOracle, OracleRecord};
use crate::traits::{KeyValueCache, OracleSource};

/// Cache key of the discovery list for one chain.
pub fn discovery_key(chain_id: u64) -> String {
    format!("oracles:{chain_id}")
}

/// Discovered oracles and their backoff state, cached per chain with a TTL.
///
/// Backoff state lives inside the discovery entry, so it is dropped together
/// with the entry when the TTL runs out and re-discovery starts every oracle
/// from zero.
#[derive(Clone)]
pub struct OracleDirectory<S, C>
where
    S: OracleSource,
    C: KeyValueCache<Vec<OracleRecord>>,
{
    source: S,
    cache: C,
    chain_ids: Vec<u64>,
    ttl: Duration,
    supported_job_types: Vec<String>,
}

impl<S, C> OracleDirectory<S, C>
where
    S: OracleSource,
    C: KeyValueCache<Vec<OracleRecord>>,
{
    pub fn new(source: S, cache: C, config: &SyncConfig) -> Self {
        Self {
            source,
            cache,
            chain_ids: config.chain_ids.clone(),
            ttl: config.discovery_ttl,
            supported_job_types: config
                .supported_job_types
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// All crawlable oracles across the enabled chains.
    ///
    /// A chain whose registry lookup fails contributes nothing; the failure
    /// is logged and the other chains are still returned.
    pub async fn discover(&self) -> Vec<OracleRecord> {
        let mut oracles = Vec::new();
        for &chain_id in &self.chain_ids {
            match self.discover_chain(chain_id).await {
                Ok(records) => oracles.extend(records),
                Err(e) => {
                    tracing::error!(chain_id, error = %e, "Oracle discovery failed");
                }
            }
        }
        oracles
    }

    async fn discover_chain(&self, chain_id: u64) -> Result<Vec<OracleRecord>, AppError> {
        let key = discovery_key(chain_id);
        if let Some(cached) = self.cache.get(&key).await? {
            return Ok(cached);
        }

        let discovered = self.source.list_oracles(chain_id).await?;
        let found = discovered.len();
        let now = Utc::now();
        let records: Vec<OracleRecord> = discovered
            .into_iter()
            .filter_map(|oracle| self.accept(oracle, chain_id, now))
            .collect();

        tracing::info!(
            chain_id,
            found,
            accepted = records.len(),
            "Discovered oracles"
        );

        self.cache.set(&key, records.clone(), Some(self.ttl)).await?;
        Ok(records)
    }

    fn accept(
        &self,
        oracle: DiscoveredOracle,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Option<OracleRecord> {
        let url = oracle.url.clone().filter(|u| !u.trim().is_empty())?;

        if !self.supported_job_types.is_empty()
            && !oracle
                .job_types
                .iter()
                .any(|t| self.supported_job_types.contains(&t.to_lowercase()))
        {
            tracing::debug!(
                chain_id,
                oracle = %oracle.address,
                "Skipping oracle without a supported job type"
            );
            return None;
        }

        Some(OracleRecord::discovered(oracle, chain_id, url, now))
    }

    /// Overwrite the stored record for `record.address`.
    ///
    /// The entry keeps its original expiry. Writes for an entry that has
    /// expired, or that was re-discovered since `record` was read, are
    /// dropped.
    pub async fn persist(&self, record: OracleRecord) -> Result<(), AppError> {
        let key = discovery_key(record.chain_id);
        let Some(mut records) = self.cache.get(&key).await? else {
            tracing::debug!(oracle = %record.address, "Discovery entry expired, dropping update");
            return Ok(());
        };

        let Some(slot) = records.iter_mut().find(|r| r.address == record.address) else {
            tracing::debug!(oracle = %record.address, "Oracle no longer discovered, dropping update");
            return Ok(());
        };

        if slot.cached_at != record.cached_at {
            tracing::debug!(oracle = %record.address, "Discovery entry was refreshed, dropping update");
            return Ok(());
        }

        let Some(remaining) = self.remaining_ttl(record.cached_at, Utc::now()) else {
            tracing::debug!(oracle = %record.address, "Discovery entry expired, dropping update");
            return Ok(());
        };

        *slot = record;
        self.cache.set(&key, records, Some(remaining)).await
    }

    fn remaining_ttl(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
        let ttl = TimeDelta::from_std(self.ttl).ok()?;
        let expires_at = cached_at.checked_add_signed(ttl)?;
        (expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Look up a discovered oracle by address.
    pub async fn find(&self, address: &str) -> Result<OracleRecord, AppError> {
        self.discover()
            .await
            .into_iter()
            .find(|r| r.address.eq_ignore_ascii_case(address))
            .ok_or_else(|| AppError::OracleNotFound(address.to_string()))
    }

    /// Resolve an oracle address to the base URL of its job API.
    pub async fn resolve_url(&self, address: &str) -> Result<String, AppError> {
        Ok(self.find(address).await?.url)
    }
}
