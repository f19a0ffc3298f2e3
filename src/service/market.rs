use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::errors::ServiceResult;
use crate::service::di_container::ServiceContainer;
use crate::service::injected::Injected;
use crate::service::slots::{PriceOracleSlot, RateCalculationSlot};
use crate::service::traits::PriceQuote;

/// Daily compounding used for supply yields.
pub const SUPPLY_COMPOUNDING_PERIODS: u32 = 365;

/// Price and supply yield of one pool asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub price: PriceQuote,
    pub supply_apr: Decimal,
    pub supply_apy: Decimal,
}

/// Market data lookups for pool assets.
#[derive(Debug, Clone)]
pub struct MarketService {
    oracle: Injected<PriceOracleSlot>,
    rates: Injected<RateCalculationSlot>,
}

impl MarketService {
    /// Creates a new `MarketService` bound to `container`.
    pub fn new(container: &Arc<ServiceContainer>) -> Self {
        Self { oracle: container.inject(), rates: container.inject() }
    }

    pub fn oracle(&self) -> &Injected<PriceOracleSlot> {
        &self.oracle
    }

    pub fn rates(&self) -> &Injected<RateCalculationSlot> {
        &self.rates
    }

    /// Current price of `asset` plus its supply APR converted to APY.
    pub async fn quote(&self, asset: &str, supply_apr: Decimal) -> ServiceResult<AssetQuote> {
        let oracle = self.oracle.read()?;
        let rates = self.rates.read()?;
        let price = oracle.price(asset).await?;
        let supply_apy = rates.apr_to_apy(supply_apr, SUPPLY_COMPOUNDING_PERIODS)?;
        Ok(AssetQuote { price, supply_apr, supply_apy })
    }
}
