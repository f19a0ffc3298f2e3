pub mod env_config;
pub mod provider;

pub use env_config::{apply_env_overrides, from_env};
pub use provider::StaticConfiguration;
