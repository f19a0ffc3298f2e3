//! Keeps RPC payloads out of logs and error messages unless explicitly enabled.

use serde_json::Value;
use std::env;

/// Set to `1` to log RPC bodies verbatim.
pub const ENV_LOG_BODIES: &str = "BLEND_LOG_BODIES";

fn bodies_enabled() -> bool {
    env::var(ENV_LOG_BODIES).ok().as_deref() == Some("1")
}

/// Body text, or a length-only placeholder.
pub fn redact_body(s: &str) -> String {
    if bodies_enabled() {
        return s.to_string();
    }
    format!("<redacted len={}>", s.len())
}

/// JSON-RPC `error` object reduced to its numeric code; the message is
/// redacted like any other body.
pub fn redact_rpc_error(err: &Value) -> String {
    if bodies_enabled() {
        return err.to_string();
    }
    match err.get("code").and_then(Value::as_i64) {
        Some(code) => format!("code={} {}", code, redact_body(&err.to_string())),
        None => redact_body(&err.to_string()),
    }
}
