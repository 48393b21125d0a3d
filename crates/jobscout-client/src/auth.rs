use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::traits::Authenticator;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http::{DEFAULT_TIMEOUT, build_client, endpoint, send_error};

/// Machine-to-machine sign-in against the reputation oracle.
///
/// Every call performs a fresh sign-in; the returned access token is used
/// for one crawl cycle.
#[derive(Clone)]
pub struct M2mAuthenticator {
    client: Client,
    base_url: String,
    secret_key: String,
    timeout_secs: u64,
}

impl M2mAuthenticator {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, AppError> {
        Self::with_timeout(base_url, secret_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        if secret_key.trim().is_empty() {
            return Err(AppError::ConfigError("M2M secret key is empty".into()));
        }
        // Reject a bad base URL up front.
        endpoint(base_url, "auth/m2m/signin")?;

        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    secret_key: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    access_token: String,
}

impl Authenticator for M2mAuthenticator {
    async fn sign_in(&self) -> Result<String, AppError> {
        let url = endpoint(&self.base_url, "auth/m2m/signin")?;

        let response = self
            .client
            .post(url)
            .json(&SignInRequest {
                secret_key: &self.secret_key,
            })
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthenticationFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: SignInResponse = response.json().await.map_err(|e| {
            AppError::AuthenticationFailed(format!("Invalid sign-in response: {e}"))
        })?;

        if body.access_token.is_empty() {
            return Err(AppError::AuthenticationFailed(
                "Sign-in returned an empty access token".into(),
            ));
        }
        Ok(body.access_token)
    }
}
