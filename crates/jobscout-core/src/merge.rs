use std::collections::HashMap;

use crate::error::AppError;
use crate::models::{JobListing, ListingKey};
use crate::traits::KeyValueCache;

/// Cache key of the merged catalog for one oracle.
pub fn catalog_key(oracle_address: &str) -> String {
    format!("jobs:{oracle_address}")
}

/// Counts reported by a single merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub replaced: usize,
    pub total: usize,
}

/// Folds freshly crawled listings into an oracle's cached catalog.
///
/// Last write wins per `(escrow_address, chain_id)`. Listings missing from a
/// new crawl are kept. Catalog entries never expire.
#[derive(Clone)]
pub struct MergeCache<C>
where
    C: KeyValueCache<Vec<JobListing>>,
{
    cache: C,
}

impl<C> MergeCache<C>
where
    C: KeyValueCache<Vec<JobListing>>,
{
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub async fn catalog(&self, oracle_address: &str) -> Result<Vec<JobListing>, AppError> {
        Ok(self
            .cache
            .get(&catalog_key(oracle_address))
            .await?
            .unwrap_or_default())
    }

    pub async fn merge(
        &self,
        oracle_address: &str,
        incoming: Vec<JobListing>,
    ) -> Result<MergeOutcome, AppError> {
        let existing = self.catalog(oracle_address).await?;
        let (merged, outcome) = merge_listings(existing, incoming);
        self.cache
            .set(&catalog_key(oracle_address), merged, None)
            .await?;
        Ok(outcome)
    }
}

/// Existing order is kept; new keys are appended in the order they arrive.
fn merge_listings(
    existing: Vec<JobListing>,
    incoming: Vec<JobListing>,
) -> (Vec<JobListing>, MergeOutcome) {
    let mut merged: Vec<JobListing> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<ListingKey, usize> = HashMap::with_capacity(merged.capacity());

    for listing in existing {
        upsert(&mut merged, &mut index, listing);
    }

    let mut outcome = MergeOutcome::default();
    for listing in incoming {
        if upsert(&mut merged, &mut index, listing) {
            outcome.replaced += 1;
        } else {
            outcome.inserted += 1;
        }
    }
    outcome.total = merged.len();

    (merged, outcome)
}

/// Returns true when an entry with the same key was overwritten.
fn upsert(
    merged: &mut Vec<JobListing>,
    index: &mut HashMap<ListingKey, usize>,
    listing: JobListing,
) -> bool {
    match index.get(&listing.key()) {
        Some(&pos) => {
            merged[pos] = listing;
            true
        }
        None => {
            index.insert(listing.key(), merged.len());
            merged.push(listing);
            false
        }
    }
}
