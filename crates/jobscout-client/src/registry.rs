use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use jobscout_core::error::AppError;
use jobscout_core::models::DiscoveredOracle;
use jobscout_core::traits::OracleSource;

/// Oracle registry read from a JSON document keyed by chain id:
///
/// ```json
/// {
///   "80002": [
///     {"address": "0x...", "role": "exchange_oracle",
///      "url": "https://...", "job_types": ["fortune"]}
///   ]
/// }
/// ```
#[derive(Clone, Default)]
pub struct StaticOracleSource {
    chains: Arc<HashMap<u64, Vec<DiscoveredOracle>>>,
}

impl StaticOracleSource {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let chains: HashMap<u64, Vec<DiscoveredOracle>> = serde_json::from_str(json)?;
        Ok(Self {
            chains: Arc::new(chains),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Cannot read oracle registry {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl OracleSource for StaticOracleSource {
    async fn list_oracles(&self, chain_id: u64) -> Result<Vec<DiscoveredOracle>, AppError> {
        match self.chains.get(&chain_id) {
            Some(oracles) => Ok(oracles.clone()),
            None => {
                tracing::warn!(chain_id, "No oracles registered for chain");
                Ok(Vec::new())
            }
        }
    }
}
