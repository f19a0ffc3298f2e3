//! The standard slot set and its default constructors.

use std::sync::Arc;

use crate::core::result_ext::ResultExt;
use crate::core::errors::ServiceResult;
use crate::network::transport::RpcTransport;
use crate::oracle::price_oracle::CachedPriceOracle;
use crate::rates::calculator::CompoundingRateCalculator;
use crate::service::di_container::{ContainerBuilder, ServiceContainer, ServiceSlot};
use crate::service::traits::{Cache, Configuration, NetworkTransport, PriceOracle, RateCalculation};
use crate::storage::cache::MemoryCache;
use crate::config::StaticConfiguration;

pub struct RateCalculationSlot;
pub struct PriceOracleSlot;
pub struct CacheSlot;
pub struct NetworkTransportSlot;
pub struct ConfigurationSlot;

impl ServiceSlot for RateCalculationSlot {
    type Service = dyn RateCalculation;
    const NAME: &'static str = "RateCalculation";

    fn construct(_: &ServiceContainer) -> ServiceResult<Arc<dyn RateCalculation>> {
        Ok(Arc::new(CompoundingRateCalculator::new()))
    }
}

impl ServiceSlot for PriceOracleSlot {
    type Service = dyn PriceOracle;
    const NAME: &'static str = "PriceOracle";

    fn construct(container: &ServiceContainer) -> ServiceResult<Arc<dyn PriceOracle>> {
        let cache = container.get::<CacheSlot>()?;
        let transport = container.get::<NetworkTransportSlot>()?;
        Ok(Arc::new(CachedPriceOracle::new(cache, transport, container.config().oracle.clone())))
    }
}

impl ServiceSlot for CacheSlot {
    type Service = dyn Cache;
    const NAME: &'static str = "Cache";

    fn construct(container: &ServiceContainer) -> ServiceResult<Arc<dyn Cache>> {
        Ok(Arc::new(MemoryCache::new(&container.config().cache)))
    }
}

impl ServiceSlot for NetworkTransportSlot {
    type Service = dyn NetworkTransport;
    const NAME: &'static str = "NetworkTransport";

    fn construct(container: &ServiceContainer) -> ServiceResult<Arc<dyn NetworkTransport>> {
        let config = container.get::<ConfigurationSlot>()?;
        let transport = RpcTransport::new(config.endpoint(), &config.settings().transport)
            .context_for(Self::NAME)?;
        Ok(Arc::new(transport))
    }
}

impl ServiceSlot for ConfigurationSlot {
    type Service = dyn Configuration;
    const NAME: &'static str = "Configuration";

    fn construct(container: &ServiceContainer) -> ServiceResult<Arc<dyn Configuration>> {
        let config = StaticConfiguration::new(container.config().clone())?;
        Ok(Arc::new(config))
    }
}

/// Register the five standard slots with their default constructors.
pub fn register_standard(builder: ContainerBuilder) -> ContainerBuilder {
    builder
        .register::<RateCalculationSlot>()
        .register::<PriceOracleSlot>()
        .register::<CacheSlot>()
        .register::<NetworkTransportSlot>()
        .register::<ConfigurationSlot>()
}
