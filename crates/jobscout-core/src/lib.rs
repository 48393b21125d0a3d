pub mod backoff;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod cycle;
pub mod directory;
pub mod error;
pub mod merge;
pub mod models;
pub mod reader;
pub mod scheduler;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use backoff::{BackoffPolicy, BackoffState};
pub use cache::MokaCache;
pub use config::SyncConfig;
pub use crawler::Crawler;
pub use cycle::{
    CycleEvent, CycleOutcome, CycleReporter, CycleService, CycleSummary, TracingCycleReporter,
};
pub use directory::OracleDirectory;
pub use error::AppError;
pub use merge::{MergeCache, MergeOutcome};
pub use models::{DiscoveredOracle, JobListing, JobsPage, OracleRecord, PageRequest, PagedResult};
pub use reader::{CatalogQuery, CatalogReader, ListingFilter, SortField, SortOrder};
pub use scheduler::{CycleRunner, IntervalTicker, Scheduler, Ticker};
pub use traits::{Authenticator, ExchangeClient, KeyValueCache, OracleSource};
