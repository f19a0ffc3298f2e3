use thiserror::Error;

/// Error type shared by the container and every service it hands out.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A slot was re-entered while it was still being constructed.
    #[error("Configuration cycle detected while resolving {slot}: {}", .chain.join(" -> "))]
    CycleDetected { slot: &'static str, chain: Vec<&'static str> },

    /// The slot has no registration in this container.
    #[error("Slot not registered: {0}")]
    NotRegistered(&'static str),

    /// A stored instance did not have the type its slot declares.
    #[error("Slot {0} holds an instance of an unexpected type")]
    TypeMismatch(&'static str),

    /// The slot's constructor failed.
    #[error("Failed to construct {slot}: {reason}")]
    Construction { slot: &'static str, reason: String },

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors.
    #[error("Network error: {0}")]
    Network(String),

    /// Cache errors.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Price oracle errors.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Whether a caller may reasonably retry the failed operation.
    /// The container itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Network(_))
    }

    /// Whether the error points at a wiring problem rather than a runtime failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ServiceError::CycleDetected { .. }
                | ServiceError::NotRegistered(_)
                | ServiceError::TypeMismatch(_)
                | ServiceError::Config(_)
        )
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Network(err.to_string())
    }
}
