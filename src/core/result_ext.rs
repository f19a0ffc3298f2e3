//! Result extension helpers for slot factories

use crate::core::errors::{ServiceError, ServiceResult};

/// Converts arbitrary failures into `ServiceError::Construction` for a named slot.
pub trait ResultExt<T> {
    /// Attach the slot name to a failure, logging it on the way out.
    fn context_for(self, slot: &'static str) -> ServiceResult<T>;
}

impl<T> ResultExt<T> for Option<T> {
    fn context_for(self, slot: &'static str) -> ServiceResult<T> {
        self.ok_or_else(|| {
            tracing::error!(slot, "constructor produced no value");
            ServiceError::Construction { slot, reason: "missing value".to_string() }
        })
    }
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context_for(self, slot: &'static str) -> ServiceResult<T> {
        self.map_err(|e| {
            tracing::error!(slot, error = %e, "constructor failed");
            ServiceError::Construction { slot, reason: e.to_string() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_context() {
        let r: Result<u8, String> = Err("bad url".to_string());
        match r.context_for("NetworkTransport") {
            Err(ServiceError::Construction { slot, reason }) => {
                assert_eq!(slot, "NetworkTransport");
                assert_eq!(reason, "bad url");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_option_context() {
        assert_eq!(Some(3).context_for("Cache").unwrap(), 3);
        assert!(None::<u8>.context_for("Cache").is_err());
    }
}
