use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::models::{JobsPage, PageRequest};
use jobscout_core::traits::ExchangeClient;
use reqwest::Client;

use crate::http::{DEFAULT_TIMEOUT, build_client, endpoint, send_error};

/// Payload fields requested on every page. A page whose listings lack any of
/// them is rejected as malformed.
pub const REQUESTED_FIELDS: [&str; 5] = [
    "job_description",
    "reward_amount",
    "reward_token",
    "created_at",
    "updated_at",
];

/// Exchange oracle job API client using reqwest.
///
/// Issues `GET {base_url}/job` with paging, an `active` status filter and the
/// requested field list, authenticated with the cycle's bearer token.
#[derive(Clone)]
pub struct ReqwestExchangeClient {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestExchangeClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout)?,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl ExchangeClient for ReqwestExchangeClient {
    async fn fetch_jobs(
        &self,
        base_url: &str,
        request: PageRequest,
        token: &str,
    ) -> Result<JobsPage, AppError> {
        let mut url = endpoint(base_url, "job")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &request.page.to_string())
                .append_pair("page_size", &request.page_size.to_string())
                .append_pair("status", "active");
            for field in REQUESTED_FIELDS {
                query.append_pair("fields", field);
            }
        }

        tracing::debug!(%url, page = request.page, "Fetching jobs page");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        serde_json::from_str(&body).map_err(|e| AppError::MalformedResponse {
            oracle: base_url.to_string(),
            message: format!("page {}: {e}", request.page),
        })
    }
}
