use std::time::Duration;

use jobscout_core::AppError;
use reqwest::Client;
use url::Url;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(concat!("jobscout/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

/// Append `segment` to the path of `base`, keeping any path prefix the base
/// already has.
pub(crate) fn endpoint(base: &str, segment: &str) -> Result<Url, AppError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), segment);
    let url = Url::parse(&joined)
        .map_err(|e| AppError::HttpError(format!("Invalid URL {joined}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::HttpError(format!(
            "URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}

pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}
