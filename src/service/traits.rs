//! Capability contracts the container hands out.
//!
//! The container only ever stores `Arc<dyn Contract>`, so every trait here
//! must stay object-safe. Tests substitute their own implementations through
//! `ServiceContainer::set` or `Injected::write`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::core::config::{AppConfig, EndpointConfig, NetworkSelector};
use crate::core::errors::ServiceResult;
use crate::core::state::ConnectionState;

/// Read-only view of the application configuration.
pub trait Configuration: Send + Sync {
    /// Network chosen when the instance was built; never changes afterwards.
    fn network(&self) -> NetworkSelector;

    /// Endpoint of the selected network.
    fn endpoint(&self) -> &EndpointConfig;

    fn settings(&self) -> &AppConfig;
}

/// Key/value cache with per-entry expiry.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value`; `ttl = None` uses the cache's default TTL.
    fn insert(&self, key: &str, value: Value, ttl: Option<Duration>);

    fn remove(&self, key: &str) -> Option<Value>;

    fn clear(&self);

    /// Number of live (unexpired) entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON-RPC transport to the selected network.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    /// Issue one RPC call and return its `result` member.
    async fn call(&self, method: &str, params: Value) -> ServiceResult<Value>;

    fn endpoint(&self) -> String;

    /// Outcome of the most recent call.
    fn connection_state(&self) -> ConnectionState;
}

/// A single price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub asset: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Price source for pool assets.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price(&self, asset: &str) -> ServiceResult<PriceQuote>;

    /// Asset every quote is denominated in.
    fn base_asset(&self) -> &str;
}

/// Conversions between simple and compounded rates.
pub trait RateCalculation: Send + Sync {
    /// Annual percentage rate to annual percentage yield, compounding `periods` times a year.
    fn apr_to_apy(&self, apr: Decimal, periods: u32) -> ServiceResult<Decimal>;

    /// Inverse of [`RateCalculation::apr_to_apy`].
    fn apy_to_apr(&self, apy: Decimal, periods: u32) -> ServiceResult<Decimal>;
}
