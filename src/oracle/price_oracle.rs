//! Price oracle backed by the Cache and NetworkTransport slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::OracleConfig;
use crate::core::errors::{ServiceError, ServiceResult};
use crate::service::traits::{Cache, NetworkTransport, PriceOracle, PriceQuote};

pub const GET_PRICE_METHOD: &str = "getPrice";

pub fn cache_key(asset: &str) -> String {
    format!("price:{}", asset)
}

pub struct CachedPriceOracle {
    cache: Arc<dyn Cache>,
    transport: Arc<dyn NetworkTransport>,
    config: OracleConfig,
}

impl CachedPriceOracle {
    pub fn new(
        cache: Arc<dyn Cache>,
        transport: Arc<dyn NetworkTransport>,
        config: OracleConfig,
    ) -> Self {
        Self { cache, transport, config }
    }

    fn cached(&self, asset: &str) -> Option<PriceQuote> {
        let value = self.cache.get(&cache_key(asset))?;
        match serde_json::from_value(value) {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(asset, error = %e, "discarding unreadable cached quote");
                self.cache.remove(&cache_key(asset));
                None
            }
        }
    }

    async fn fetch(&self, asset: &str) -> ServiceResult<PriceQuote> {
        let result = self
            .transport
            .call(GET_PRICE_METHOD, json!({ "asset": asset, "base": self.config.base_asset }))
            .await?;
        parse_quote(asset, &result)
    }
}

fn parse_quote(asset: &str, result: &Value) -> ServiceResult<PriceQuote> {
    let price = match result.get("price") {
        Some(Value::String(s)) => Decimal::from_str(s.trim()),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()),
        _ => return Err(ServiceError::Oracle(format!("no price for {}", asset))),
    }
    .map_err(|e| ServiceError::Oracle(format!("unreadable price for {}: {}", asset, e)))?;

    if price <= Decimal::ZERO {
        return Err(ServiceError::Oracle(format!("non-positive price for {}: {}", asset, price)));
    }

    let timestamp = match result.get("timestamp").and_then(Value::as_i64) {
        Some(secs) => DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| ServiceError::Oracle(format!("timestamp out of range: {}", secs)))?,
        None => Utc::now(),
    };

    Ok(PriceQuote { asset: asset.to_string(), price, timestamp })
}

#[async_trait]
impl PriceOracle for CachedPriceOracle {
    async fn price(&self, asset: &str) -> ServiceResult<PriceQuote> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(ServiceError::InvalidInput("asset must not be empty".to_string()));
        }
        if asset.eq_ignore_ascii_case(&self.config.base_asset) {
            return Ok(PriceQuote { asset: asset.to_string(), price: Decimal::ONE, timestamp: Utc::now() });
        }
        if let Some(quote) = self.cached(asset) {
            tracing::trace!(asset, "price served from cache");
            return Ok(quote);
        }

        let quote = self.fetch(asset).await?;
        self.cache.insert(
            &cache_key(asset),
            serde_json::to_value(&quote)?,
            Some(Duration::from_secs(self.config.price_ttl_secs)),
        );
        tracing::debug!(asset, price = %quote.price, "price fetched");
        Ok(quote)
    }

    fn base_asset(&self) -> &str {
        &self.config.base_asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_string_price() {
        let q = parse_quote("XLM", &json!({ "price": "0.1234", "timestamp": 1_700_000_000 })).unwrap();
        assert_eq!(q.price, dec("0.1234"));
        assert_eq!(q.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_numeric_price() {
        let q = parse_quote("BLND", &json!({ "price": 2.5 })).unwrap();
        assert_eq!(q.price, dec("2.5"));
    }

    #[test]
    fn test_rejects_missing_and_non_positive() {
        assert!(parse_quote("XLM", &json!({})).is_err());
        assert!(parse_quote("XLM", &json!({ "price": "0" })).is_err());
        assert!(parse_quote("XLM", &json!({ "price": "abc" })).is_err());
    }
}
