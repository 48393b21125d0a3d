use thiserror::Error;

/// Application-wide error types for Jobscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// The service identity could not obtain a bearer token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The oracle registry could not be queried.
    #[error("Oracle discovery failed for chain {chain_id}: {message}")]
    DiscoveryFailed { chain_id: u64, message: String },

    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// An oracle answered with a page that does not have the expected shape.
    #[error("Malformed response from {oracle}: {message}")]
    MalformedResponse { oracle: String, message: String },

    /// No discovered oracle has this address.
    #[error("Oracle not found: {0}")]
    OracleNotFound(String),

    /// Caller-supplied paging, sorting or filtering parameters are invalid.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The key-value cache rejected a read or write.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("HTTP 5")
                    || msg.contains("HTTP 429")
                    || msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
            }
            _ => false,
        }
    }
}
