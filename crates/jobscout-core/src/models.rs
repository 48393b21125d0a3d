use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An oracle as reported by the registry, before any crawl state is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredOracle {
    pub address: String,
    pub role: String,
    /// Base URL of the oracle's job API. Oracles without one cannot be crawled.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub job_types: Vec<String>,
}

/// A discovered oracle together with its crawl backoff state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    pub address: String,
    pub chain_id: u64,
    pub role: String,
    pub url: String,
    pub job_types: Vec<String>,
    pub consecutive_failures: u32,
    pub skip_cycles_remaining: u32,
    /// When the discovery entry holding this record was written.
    pub cached_at: DateTime<Utc>,
}

impl OracleRecord {
    /// Wrap a registry result into a record with zeroed backoff fields.
    pub fn discovered(
        oracle: DiscoveredOracle,
        chain_id: u64,
        url: String,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address: oracle.address,
            chain_id,
            role: oracle.role,
            url,
            job_types: oracle.job_types,
            consecutive_failures: 0,
            skip_cycles_remaining: 0,
            cached_at,
        }
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_cycles_remaining > 0
    }
}

/// Composite identity of a job listing across merges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingKey {
    pub escrow_address: String,
    pub chain_id: u64,
}

/// One job advertised by an exchange oracle.
///
/// Only `escrow_address` and `chain_id` carry meaning for the cache; the
/// remaining fields are copied verbatim from the oracle's page. The nullable
/// fields must still be present on the wire: an oracle that omits them is
/// answering with a malformed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub escrow_address: String,
    pub chain_id: u64,
    pub job_type: String,
    pub status: String,
    #[serde(deserialize_with = "required_nullable")]
    pub job_description: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub reward_amount: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub reward_token: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "required_nullable")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifications: Option<Vec<String>>,
}

impl JobListing {
    pub fn key(&self) -> ListingKey {
        ListingKey {
            escrow_address: self.escrow_address.clone(),
            chain_id: self.chain_id,
        }
    }
}

/// Rejects a missing key while still accepting an explicit `null`.
fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// One page of an exchange oracle's job catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsPage {
    pub results: Vec<JobListing>,
    pub total_pages: u32,
}

/// Parameters of a single page request against an exchange oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

/// A page of a cached catalog served to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult<T> {
    pub results: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_results: usize,
}
