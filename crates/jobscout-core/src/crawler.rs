use futures::future::try_join_all;
use futures::{StreamExt, TryStreamExt, stream};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::{JobListing, JobsPage, OracleRecord, PageRequest};
use crate::traits::ExchangeClient;

/// Drives the paginated fetch of one oracle's job catalog.
#[derive(Clone)]
pub struct Crawler<X>
where
    X: ExchangeClient,
{
    client: X,
    page_size: u32,
    page_concurrency: Option<usize>,
}

impl<X> Crawler<X>
where
    X: ExchangeClient,
{
    pub fn new(client: X, config: &SyncConfig) -> Self {
        Self {
            client,
            page_size: config.page_size,
            page_concurrency: config.page_concurrency,
        }
    }

    /// Fetch every page of `oracle`'s catalog.
    ///
    /// Page 0 reports the page count; the remaining pages are requested
    /// concurrently. Any failed page fails the whole crawl. The listings are
    /// returned in page order, unmerged.
    pub async fn crawl_one(
        &self,
        oracle: &OracleRecord,
        token: &str,
    ) -> Result<Vec<JobListing>, AppError> {
        let first = self.fetch_page(oracle, 0, token).await?;
        let total_pages = first.total_pages;
        let mut listings = first.results;

        if total_pages > 1 {
            tracing::debug!(
                oracle = %oracle.address,
                total_pages,
                "Fetching remaining pages"
            );
            let requests = (1..total_pages).map(|page| self.fetch_page(oracle, page, token));
            let pages: Vec<JobsPage> = match self.page_concurrency {
                None => try_join_all(requests).await?,
                Some(limit) => {
                    stream::iter(requests)
                        .buffered(limit.max(1))
                        .try_collect()
                        .await?
                }
            };
            for page in pages {
                listings.extend(page.results);
            }
        }

        Ok(listings)
    }

    async fn fetch_page(
        &self,
        oracle: &OracleRecord,
        page: u32,
        token: &str,
    ) -> Result<JobsPage, AppError> {
        let request = PageRequest {
            page,
            page_size: self.page_size,
        };
        self.client.fetch_jobs(&oracle.url, request, token).await
    }
}
