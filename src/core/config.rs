use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::errors::{ServiceError, ServiceResult};

/// Upper bound for any configured TTL: one year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Which Stellar network the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkSelector {
    #[default]
    Testnet,
    Mainnet,
}

impl NetworkSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkSelector::Testnet => "testnet",
            NetworkSelector::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkSelector {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(NetworkSelector::Testnet),
            "mainnet" | "main" | "public" => Ok(NetworkSelector::Mainnet),
            other => Err(ServiceError::Config(format!("unknown network: {}", other))),
        }
    }
}

/// RPC endpoint of a single network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub rpc_url: String,
    pub passphrase: String,
}

/// Endpoints for both networks; the selector picks one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEndpoints {
    #[serde(default = "NetworkEndpoints::default_testnet")]
    pub testnet: EndpointConfig,
    #[serde(default = "NetworkEndpoints::default_mainnet")]
    pub mainnet: EndpointConfig,
}

impl NetworkEndpoints {
    fn default_testnet() -> EndpointConfig {
        EndpointConfig {
            name: "Stellar Testnet".to_string(),
            rpc_url: "https://soroban-testnet.stellar.org".to_string(),
            passphrase: "Test SDF Network ; September 2015".to_string(),
        }
    }

    fn default_mainnet() -> EndpointConfig {
        EndpointConfig {
            name: "Stellar Mainnet".to_string(),
            rpc_url: "https://mainnet.sorobanrpc.com".to_string(),
            passphrase: "Public Global Stellar Network ; September 2015".to_string(),
        }
    }

    pub fn get(&self, network: NetworkSelector) -> &EndpointConfig {
        match network {
            NetworkSelector::Testnet => &self.testnet,
            NetworkSelector::Mainnet => &self.mainnet,
        }
    }

    pub fn get_mut(&mut self, network: NetworkSelector) -> &mut EndpointConfig {
        match network {
            NetworkSelector::Testnet => &mut self.testnet,
            NetworkSelector::Mainnet => &mut self.mainnet,
        }
    }
}

impl Default for NetworkEndpoints {
    fn default() -> Self {
        Self { testnet: Self::default_testnet(), mainnet: Self::default_mainnet() }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry TTL used when a caller does not pass one (seconds)
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Maximum number of live entries
    #[serde(default = "CacheConfig::default_max_entries")]
    pub max_entries: usize,
}

impl CacheConfig {
    fn default_ttl_secs() -> u64 { 60 }
    fn default_max_entries() -> usize { 1024 }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: Self::default_ttl_secs(),
            max_entries: Self::default_max_entries(),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "TransportConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Request budget per second
    #[serde(default = "TransportConfig::default_requests_per_second")]
    pub requests_per_second: u32,
}

impl TransportConfig {
    fn default_timeout_secs() -> u64 { 15 }
    fn default_requests_per_second() -> u32 { 10 }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            requests_per_second: Self::default_requests_per_second(),
        }
    }
}

/// Price oracle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// How long a fetched quote stays in the cache (seconds)
    #[serde(default = "OracleConfig::default_price_ttl_secs")]
    pub price_ttl_secs: u64,

    /// Asset every price is denominated in
    #[serde(default = "OracleConfig::default_base_asset")]
    pub base_asset: String,
}

impl OracleConfig {
    fn default_price_ttl_secs() -> u64 { 30 }
    fn default_base_asset() -> String { "USDC".to_string() }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            price_ttl_secs: Self::default_price_ttl_secs(),
            base_asset: Self::default_base_asset(),
        }
    }
}

/// Application configuration consumed by the Configuration slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkSelector,
    #[serde(default)]
    pub endpoints: NetworkEndpoints,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl AppConfig {
    /// Config with every default except the network.
    pub fn for_network(network: NetworkSelector) -> Self {
        Self { network, ..Self::default() }
    }

    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ServiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Serialization(e.to_string()))
    }

    /// Endpoint of the selected network.
    pub fn active_endpoint(&self) -> &EndpointConfig {
        self.endpoints.get(self.network)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        for network in [NetworkSelector::Testnet, NetworkSelector::Mainnet] {
            if self.endpoints.get(network).rpc_url.trim().is_empty() {
                return Err(ServiceError::Config(format!("{} rpc_url is empty", network)));
            }
        }
        if self.cache.default_ttl_secs == 0 || self.cache.default_ttl_secs > MAX_TTL_SECS {
            return Err(ServiceError::Config(format!(
                "cache.default_ttl_secs must be in 1..={}",
                MAX_TTL_SECS
            )));
        }
        if self.cache.max_entries == 0 {
            return Err(ServiceError::Config("cache.max_entries must be > 0".into()));
        }
        if self.transport.timeout_secs == 0 {
            return Err(ServiceError::Config("transport.timeout_secs must be > 0".into()));
        }
        if self.transport.requests_per_second == 0 {
            return Err(ServiceError::Config("transport.requests_per_second must be > 0".into()));
        }
        if self.oracle.price_ttl_secs == 0 || self.oracle.price_ttl_secs > MAX_TTL_SECS {
            return Err(ServiceError::Config(format!(
                "oracle.price_ttl_secs must be in 1..={}",
                MAX_TTL_SECS
            )));
        }
        if self.oracle.base_asset.trim().is_empty() {
            return Err(ServiceError::Config("oracle.base_asset is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.network, NetworkSelector::Testnet);
        assert!(cfg.validate().is_ok());
        assert!(cfg.active_endpoint().rpc_url.contains("testnet"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg = AppConfig::from_toml_str("network = \"mainnet\"\n[cache]\nmax_entries = 8\n")
            .unwrap();
        assert_eq!(cfg.network, NetworkSelector::Mainnet);
        assert_eq!(cfg.cache.max_entries, 8);
        assert_eq!(cfg.cache.default_ttl_secs, 60);
        assert_eq!(cfg.active_endpoint().name, "Stellar Mainnet");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = AppConfig::from_toml_str("[oracle]\nprice_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\ndefault_ttl_secs = 31536001\n")
            .unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));

        let mut cfg = AppConfig::default();
        cfg.oracle.price_ttl_secs = MAX_TTL_SECS + 1;
        assert!(cfg.validate().is_err());
        cfg.oracle.price_ttl_secs = MAX_TTL_SECS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!("MAINNET".parse::<NetworkSelector>().unwrap(), NetworkSelector::Mainnet);
        assert_eq!("test".parse::<NetworkSelector>().unwrap(), NetworkSelector::Testnet);
        assert!("devnet".parse::<NetworkSelector>().is_err());
    }
}
