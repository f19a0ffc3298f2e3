//! Environment overrides applied on top of a loaded `AppConfig`.

use std::env;

use crate::core::config::{AppConfig, NetworkSelector};
use crate::core::errors::{ServiceError, ServiceResult};

pub const ENV_NETWORK: &str = "BLEND_NETWORK";
pub const ENV_RPC_URL: &str = "BLEND_RPC_URL";
pub const ENV_CACHE_TTL_SECS: &str = "BLEND_CACHE_TTL_SECS";

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Apply `BLEND_*` overrides. `BLEND_NETWORK` is applied before
/// `BLEND_RPC_URL` so the URL lands on the selected network's endpoint.
pub fn apply_env_overrides(cfg: &mut AppConfig) -> ServiceResult<()> {
    if let Some(network) = non_empty_var(ENV_NETWORK) {
        cfg.network = network.parse::<NetworkSelector>()?;
        tracing::debug!(network = %cfg.network, "network overridden from environment");
    }
    if let Some(url) = non_empty_var(ENV_RPC_URL) {
        cfg.endpoints.get_mut(cfg.network).rpc_url = url;
    }
    if let Some(ttl) = non_empty_var(ENV_CACHE_TTL_SECS) {
        cfg.cache.default_ttl_secs = ttl
            .parse::<u64>()
            .map_err(|e| ServiceError::Config(format!("{}: {}", ENV_CACHE_TTL_SECS, e)))?;
    }
    cfg.validate()
}

/// Defaults plus environment overrides.
pub fn from_env() -> ServiceResult<AppConfig> {
    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}
