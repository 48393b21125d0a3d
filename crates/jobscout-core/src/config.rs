use std::time::Duration;

use crate::error::AppError;

/// Polygon Amoy, the chain the registry is queried on when none is configured.
pub const DEFAULT_CHAIN_ID: u64 = 80002;

/// Largest page size the exchange oracles accept.
pub const MAX_EXCHANGE_PAGE_SIZE: u32 = 10;

/// Configuration for the crawl-and-cache engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Feature flag. When off, the scheduler never starts.
    pub enabled: bool,
    pub interval: Duration,
    pub discovery_ttl: Duration,
    /// Upper bound on skip cycles accumulated through backoff.
    pub max_skip_cycles: u32,
    pub page_size: u32,
    pub chain_ids: Vec<u64>,
    /// Job types an oracle must advertise (at least one of) to be crawled.
    /// Empty accepts every oracle.
    pub supported_job_types: Vec<String>,
    /// Cap on simultaneous page requests per oracle. `None` fetches every
    /// remaining page at once.
    pub page_concurrency: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(60),
            discovery_ttl: Duration::from_secs(24 * 60 * 60),
            max_skip_cycles: 32,
            page_size: MAX_EXCHANGE_PAGE_SIZE,
            chain_ids: vec![DEFAULT_CHAIN_ID],
            supported_job_types: Vec::new(),
            page_concurrency: None,
        }
    }
}

impl SyncConfig {
    /// Read configuration from environment variables.
    ///
    /// - `JOBS_DISCOVERY_ENABLED` (optional, defaults to false)
    /// - `JOBS_DISCOVERY_INTERVAL_SECS` (optional, defaults to 60)
    /// - `ORACLE_DISCOVERY_TTL_SECS` (optional, defaults to 86400)
    /// - `MAX_EXECUTIONS_TO_SKIP` (optional, defaults to 32)
    /// - `EXCHANGE_PAGE_SIZE` (optional, defaults to 10)
    /// - `CHAIN_IDS_ENABLED` (optional, comma separated, defaults to 80002)
    /// - `SUPPORTED_JOB_TYPES` (optional, comma separated)
    /// - `PAGE_FETCH_CONCURRENCY` (optional, unbounded when unset)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("JOBS_DISCOVERY_ENABLED") {
            None => defaults.enabled,
            Some(raw) => parse_flag("JOBS_DISCOVERY_ENABLED", &raw)?,
        };

        let interval = match lookup("JOBS_DISCOVERY_INTERVAL_SECS") {
            None => defaults.interval,
            Some(raw) => {
                Duration::from_secs(parse_positive("JOBS_DISCOVERY_INTERVAL_SECS", &raw)?)
            }
        };

        let discovery_ttl = match lookup("ORACLE_DISCOVERY_TTL_SECS") {
            None => defaults.discovery_ttl,
            Some(raw) => {
                Duration::from_secs(parse_positive("ORACLE_DISCOVERY_TTL_SECS", &raw)?)
            }
        };

        let max_skip_cycles = match lookup("MAX_EXECUTIONS_TO_SKIP") {
            None => defaults.max_skip_cycles,
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid MAX_EXECUTIONS_TO_SKIP '{raw}': must be a non-negative integer"
                ))
            })?,
        };

        let page_size = match lookup("EXCHANGE_PAGE_SIZE") {
            None => defaults.page_size,
            Some(raw) => {
                let parsed = parse_positive("EXCHANGE_PAGE_SIZE", &raw)?;
                if parsed > u64::from(MAX_EXCHANGE_PAGE_SIZE) {
                    return Err(AppError::ConfigError(format!(
                        "EXCHANGE_PAGE_SIZE must be at most {MAX_EXCHANGE_PAGE_SIZE}"
                    )));
                }
                parsed as u32
            }
        };

        let chain_ids = match lookup("CHAIN_IDS_ENABLED") {
            None => defaults.chain_ids,
            Some(raw) => {
                let ids = split_list(&raw)
                    .map(|id| {
                        id.parse::<u64>().map_err(|_| {
                            AppError::ConfigError(format!(
                                "Invalid chain id '{id}' in CHAIN_IDS_ENABLED"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if ids.is_empty() {
                    return Err(AppError::ConfigError(
                        "CHAIN_IDS_ENABLED must list at least one chain id".into(),
                    ));
                }
                ids
            }
        };

        let supported_job_types = lookup("SUPPORTED_JOB_TYPES")
            .map(|raw| split_list(&raw).map(str::to_string).collect())
            .unwrap_or(defaults.supported_job_types);

        let page_concurrency = match lookup("PAGE_FETCH_CONCURRENCY") {
            None => None,
            Some(raw) => Some(parse_positive("PAGE_FETCH_CONCURRENCY", &raw)? as usize),
        };

        Ok(Self {
            enabled,
            interval,
            discovery_ttl,
            max_skip_cycles,
            page_size,
            chain_ids,
            supported_job_types,
            page_concurrency,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_discovery_ttl(mut self, ttl: Duration) -> Self {
        self.discovery_ttl = ttl;
        self
    }

    pub fn with_max_skip_cycles(mut self, cap: u32) -> Self {
        self.max_skip_cycles = cap;
        self
    }

    pub fn with_chain_ids(mut self, chain_ids: Vec<u64>) -> Self {
        self.chain_ids = chain_ids;
        self
    }

    pub fn with_supported_job_types(mut self, job_types: Vec<String>) -> Self {
        self.supported_job_types = job_types;
        self
    }

    pub fn with_page_concurrency(mut self, limit: usize) -> Self {
        self.page_concurrency = Some(limit);
        self
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {name} '{raw}': expected true or false"
        ))),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {name} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
