use crate::core::config::{AppConfig, EndpointConfig, NetworkSelector};
use crate::core::errors::ServiceResult;
use crate::service::traits::Configuration;

/// Configuration fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticConfiguration {
    settings: AppConfig,
}

impl StaticConfiguration {
    /// Validates `settings` before accepting it.
    pub fn new(settings: AppConfig) -> ServiceResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }
}

impl Configuration for StaticConfiguration {
    fn network(&self) -> NetworkSelector {
        self.settings.network
    }

    fn endpoint(&self) -> &EndpointConfig {
        self.settings.active_endpoint()
    }

    fn settings(&self) -> &AppConfig {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_follows_selector() {
        let cfg = StaticConfiguration::new(AppConfig::for_network(NetworkSelector::Mainnet)).unwrap();
        assert_eq!(cfg.network(), NetworkSelector::Mainnet);
        assert_eq!(cfg.endpoint().passphrase, "Public Global Stellar Network ; September 2015");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = AppConfig::default();
        settings.endpoints.testnet.rpc_url.clear();
        assert!(StaticConfiguration::new(settings).is_err());
    }
}
