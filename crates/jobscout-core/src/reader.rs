use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::merge::catalog_key;
use crate::models::{JobListing, PagedResult};
use crate::traits::KeyValueCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    RewardAmount,
    ChainId,
    EscrowAddress,
    JobType,
    Status,
}

impl FromStr for SortField {
    type Err = AppError;

    /// Accepts snake_case and camelCase names. An empty string selects
    /// `created_at`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "updated_at" | "updatedAt" => Ok(Self::UpdatedAt),
            "reward_amount" | "rewardAmount" => Ok(Self::RewardAmount),
            "chain_id" | "chainId" => Ok(Self::ChainId),
            "escrow_address" | "escrowAddress" => Ok(Self::EscrowAddress),
            "job_type" | "jobType" => Ok(Self::JobType),
            "status" => Ok(Self::Status),
            other => Err(AppError::InvalidQuery(format!("unknown sort field: {other}"))),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::RewardAmount => "reward_amount",
            Self::ChainId => "chain_id",
            Self::EscrowAddress => "escrow_address",
            Self::JobType => "job_type",
            Self::Status => "status",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(AppError::InvalidQuery(format!("unknown sort order: {other}"))),
        }
    }
}

/// Optional equality filters applied before sorting and paging.
/// String fields compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub chain_id: Option<u64>,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub escrow_address: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &JobListing) -> bool {
        fn same(wanted: &Option<String>, actual: &str) -> bool {
            wanted
                .as_deref()
                .is_none_or(|w| w.eq_ignore_ascii_case(actual))
        }

        self.chain_id.is_none_or(|id| id == listing.chain_id)
            && same(&self.job_type, &listing.job_type)
            && same(&self.status, &listing.status)
            && same(&self.escrow_address, &listing.escrow_address)
    }
}

/// Paging, sorting and filtering parameters of one catalog read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub page: usize,
    pub page_size: usize,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub filter: ListingFilter,
}

impl CatalogQuery {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            filter: ListingFilter::default(),
        }
    }

    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    pub fn with_filter(mut self, filter: ListingFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Read-only paged views over the merged catalogs.
#[derive(Clone)]
pub struct CatalogReader<C>
where
    C: KeyValueCache<Vec<JobListing>>,
{
    cache: C,
}

impl<C> CatalogReader<C>
where
    C: KeyValueCache<Vec<JobListing>>,
{
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Query the cached catalog of one oracle. An oracle that was never
    /// crawled reads as an empty catalog.
    pub async fn query_oracle(
        &self,
        oracle_address: &str,
        query: &CatalogQuery,
    ) -> Result<PagedResult<JobListing>, AppError> {
        let catalog = self
            .cache
            .get(&catalog_key(oracle_address))
            .await?
            .unwrap_or_default();
        query_catalog(&catalog, query)
    }
}

/// Filter, sort and slice `catalog`.
///
/// Pages past the end come back empty; `total_pages` and `total_results`
/// describe the filtered set.
pub fn query_catalog(
    catalog: &[JobListing],
    query: &CatalogQuery,
) -> Result<PagedResult<JobListing>, AppError> {
    if query.page_size == 0 {
        return Err(AppError::InvalidQuery("page size must be positive".into()));
    }

    let mut matching: Vec<&JobListing> = catalog
        .iter()
        .filter(|listing| query.filter.matches(listing))
        .collect();

    matching.sort_by(|a, b| {
        let ord = compare(a, b, query.sort_field);
        match query.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let total_results = matching.len();
    let start = query
        .page
        .checked_mul(query.page_size)
        .unwrap_or(usize::MAX)
        .min(total_results);
    let end = start.saturating_add(query.page_size).min(total_results);

    Ok(PagedResult {
        results: matching[start..end].iter().map(|l| (*l).clone()).collect(),
        page: query.page,
        page_size: query.page_size,
        total_pages: total_results.div_ceil(query.page_size),
        total_results,
    })
}

fn compare(a: &JobListing, b: &JobListing, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::RewardAmount => compare_rewards(&a.reward_amount, &b.reward_amount),
        SortField::ChainId => a.chain_id.cmp(&b.chain_id),
        SortField::EscrowAddress => a.escrow_address.cmp(&b.escrow_address),
        SortField::JobType => a.job_type.cmp(&b.job_type),
        SortField::Status => a.status.cmp(&b.status),
    }
}

/// Missing rewards sort first, then numeric rewards by value, then anything
/// else by text.
fn compare_rewards(a: &Option<String>, b: &Option<String>) -> Ordering {
    let (ka, kb) = (RewardKey::of(a), RewardKey::of(b));
    ka.rank().cmp(&kb.rank()).then_with(|| match (ka, kb) {
        (RewardKey::Number(x), RewardKey::Number(y)) => x.total_cmp(&y),
        (RewardKey::Text(x), RewardKey::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    })
}

#[derive(Clone, Copy)]
enum RewardKey<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> RewardKey<'a> {
    fn of(reward: &'a Option<String>) -> Self {
        match reward.as_deref() {
            None => Self::Missing,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(value) => Self::Number(value),
                Err(_) => Self::Text(raw),
            },
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }
}
