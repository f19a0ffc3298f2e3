//! Lifecycle state sets passed between services and their consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a component's start-up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InitializationState {
    #[default]
    NotStarted,
    Initializing,
    Ready,
    Failed { reason: String },
}

impl InitializationState {
    pub fn failed(reason: impl Into<String>) -> Self {
        InitializationState::Failed { reason: reason.into() }
    }

    /// Ready and Failed have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InitializationState::Ready | InitializationState::Failed { .. })
    }

    pub fn can_transition_to(&self, next: &InitializationState) -> bool {
        use InitializationState::*;
        matches!(
            (self, next),
            (NotStarted, Initializing) | (Initializing, Ready) | (Initializing, Failed { .. })
        )
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            InitializationState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationState::NotStarted => write!(f, "Not started"),
            InitializationState::Initializing => write!(f, "Initializing"),
            InitializationState::Ready => write!(f, "Ready"),
            InitializationState::Failed { reason } => write!(f, "Failed: {}", reason),
        }
    }
}

/// Last observed state of a network link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
    Unstable {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl ConnectionState {
    pub fn disconnected(reason: impl Into<String>) -> Self {
        ConnectionState::Disconnected { reason: Some(reason.into()) }
    }

    pub fn unstable(reason: impl Into<String>) -> Self {
        ConnectionState::Unstable { reason: Some(reason.into()) }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ConnectionState::Disconnected { reason } | ConnectionState::Unstable { reason } => {
                reason.as_deref()
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Unknown => write!(f, "Unknown"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnected { reason: Some(r) } => write!(f, "Disconnected: {}", r),
            ConnectionState::Disconnected { reason: None } => write!(f, "Disconnected"),
            ConnectionState::Unstable { reason: Some(r) } => write!(f, "Unstable: {}", r),
            ConnectionState::Unstable { reason: None } => write!(f, "Unstable"),
        }
    }
}
