// src/lib.rs

pub mod config;
pub mod core;
pub mod network;
pub mod oracle;
pub mod rates;
pub mod security;
pub mod service;
pub mod storage;

pub use crate::core::{AppConfig, ServiceError, ServiceResult};
pub use crate::service::{Injected, ServiceContainer, ServiceSlot};
