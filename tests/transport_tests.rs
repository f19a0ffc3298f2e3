//! tests/transport_tests.rs
//!
//! Tests for `src/network/transport.rs`: JSON-RPC success and failure paths and
//! the connection state each one leaves behind.

use blend_services::core::config::{EndpointConfig, TransportConfig};
use blend_services::core::errors::ServiceError;
use blend_services::core::state::ConnectionState;
use blend_services::network::RpcTransport;
use blend_services::service::traits::NetworkTransport;
use httpmock::{Method, MockServer};
use serde_json::json;

fn endpoint(url: String) -> EndpointConfig {
    EndpointConfig {
        name: "mock".to_string(),
        rpc_url: url,
        passphrase: "Standalone Network ; February 2017".to_string(),
    }
}

fn transport(url: String, requests_per_second: u32) -> RpcTransport {
    RpcTransport::new(&endpoint(url), &TransportConfig { timeout_secs: 5, requests_per_second })
        .unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn test_call_success_marks_connected() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/")
                .header("content-type", "application/json")
                .body_contains("\"method\":\"getLatestLedger\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "sequence": 51234 }
            }));
        })
        .await;

    let t = transport(server.base_url(), 10);
    let result = t.call("getLatestLedger", json!({})).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result, json!({ "sequence": 51234 }));
    assert_eq!(t.connection_state(), ConnectionState::Connected);
}

#[tokio::test(flavor = "current_thread")]
async fn test_rpc_error_marks_unstable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).header("content-type", "application/json").json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32600, "message": "invalid request" }
            }));
        })
        .await;

    let t = transport(server.base_url(), 10);
    let err = t.call("getPrice", json!({ "asset": "XLM" })).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(t.connection_state(), ConnectionState::unstable("invalid request"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_http_error_marks_unstable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let t = transport(server.base_url(), 10);
    let err = t.call("getHealth", json!({})).await.unwrap_err();

    match err {
        ServiceError::Network(msg) => assert!(msg.contains("503")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(matches!(t.connection_state(), ConnectionState::Unstable { .. }));
}

#[tokio::test(flavor = "current_thread")]
async fn test_mismatched_id_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({ "jsonrpc": "2.0", "id": 42, "result": {} }));
        })
        .await;

    let t = transport(server.base_url(), 10);
    assert!(t.call("getHealth", json!({})).await.is_err());
    assert_eq!(t.connection_state(), ConnectionState::unstable("mismatched response id"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_marks_disconnected() {
    let t = transport("http://127.0.0.1:1".to_string(), 10);
    let err = t.call("getHealth", json!({})).await.unwrap_err();

    assert!(matches!(err, ServiceError::Network(_)));
    assert!(matches!(
        t.connection_state(),
        ConnectionState::Disconnected { reason: Some(_) }
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn test_throttled_call_fails_fast() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({ "jsonrpc": "2.0", "result": "ok" }));
        })
        .await;

    let t = transport(server.base_url(), 1);
    assert!(t.call("getHealth", json!({})).await.is_ok());
    let err = t.call("getHealth", json!({})).await.unwrap_err();

    mock.assert_hits_async(1).await;
    assert_eq!(err.to_string(), "Network error: rate limited");
    assert_eq!(t.connection_state(), ConnectionState::unstable("rate limited"));
}
