//! JSON-RPC transport backing the NetworkTransport slot.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::config::{EndpointConfig, TransportConfig};
use crate::core::errors::{ServiceError, ServiceResult};
use crate::core::state::ConnectionState;
use crate::network::rate_limit::RateLimiter;
use crate::security::redaction::{redact_body, redact_rpc_error};
use crate::service::traits::NetworkTransport;

pub struct RpcTransport {
    client: Client,
    rpc_url: String,
    limiter: RateLimiter,
    state: Mutex<ConnectionState>,
    next_id: AtomicU64,
}

impl RpcTransport {
    /// Create a transport pointing at the endpoint's RPC URL.
    pub fn new(endpoint: &EndpointConfig, config: &TransportConfig) -> ServiceResult<Self> {
        reqwest::Url::parse(&endpoint.rpc_url).map_err(|e| {
            ServiceError::Config(format!("invalid rpc_url {}: {}", endpoint.rpc_url, e))
        })?;
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            rpc_url: endpoint.rpc_url.clone(),
            limiter: RateLimiter::per_second(config.requests_per_second),
            state: Mutex::new(ConnectionState::Unknown),
            next_id: AtomicU64::new(1),
        })
    }

    fn record(&self, state: ConnectionState) {
        let mut current = self.state.lock();
        if *current != state {
            let previous = std::mem::replace(&mut *current, state);
            let now: &ConnectionState = &current;
            tracing::debug!(endpoint = %self.rpc_url, from = %previous, to = %now, "connection state changed");
        }
    }

    fn fail(&self, state: ConnectionState, message: String) -> ServiceError {
        tracing::error!(endpoint = %self.rpc_url, "{}", message);
        self.record(state);
        ServiceError::Network(message)
    }
}

#[async_trait]
impl NetworkTransport for RpcTransport {
    async fn call(&self, method: &str, params: Value) -> ServiceResult<Value> {
        if !self.limiter.allow() {
            self.record(ConnectionState::unstable("rate limited"));
            return Err(ServiceError::Network("rate limited".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = match self.client.post(&self.rpc_url).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Err(self.fail(ConnectionState::disconnected(e.to_string()), e.to_string()))
            }
        };
        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                return Err(self.fail(ConnectionState::disconnected(e.to_string()), e.to_string()))
            }
        };

        if !status.is_success() {
            return Err(self.fail(
                ConnectionState::unstable(format!("http status {}", status)),
                format!("rpc error status: {} body: {}", status, redact_body(&text)),
            ));
        }

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) => {
                return Err(self.fail(
                    ConnectionState::unstable("malformed response"),
                    format!("unexpected rpc response: {}", redact_body(&text)),
                ))
            }
        };

        if let Some(resp_id) = body.get("id").and_then(Value::as_u64) {
            if resp_id != id {
                return Err(self.fail(
                    ConnectionState::unstable("mismatched response id"),
                    format!("rpc response id {} does not match request id {}", resp_id, id),
                ));
            }
        }

        if let Some(result) = body.get("result") {
            self.record(ConnectionState::Connected);
            Ok(result.clone())
        } else if let Some(err) = body.get("error") {
            let message = err.get("message").and_then(Value::as_str).unwrap_or("rpc error");
            Err(self.fail(
                ConnectionState::unstable(message.to_string()),
                format!("rpc returned error: {}", redact_rpc_error(err)),
            ))
        } else {
            Err(self.fail(
                ConnectionState::unstable("malformed response"),
                format!("unexpected rpc response: {}", redact_body(&text)),
            ))
        }
    }

    fn endpoint(&self) -> String {
        self.rpc_url.clone()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> EndpointConfig {
        EndpointConfig {
            name: "local".to_string(),
            rpc_url: url.to_string(),
            passphrase: "Standalone Network ; February 2017".to_string(),
        }
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = RpcTransport::new(&endpoint("not a url"), &TransportConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_starts_unknown() {
        let t = RpcTransport::new(&endpoint("http://127.0.0.1:8000"), &TransportConfig::default())
            .unwrap();
        assert_eq!(t.connection_state(), ConnectionState::Unknown);
        assert_eq!(t.endpoint(), "http://127.0.0.1:8000");
    }
}
