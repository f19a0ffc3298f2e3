pub mod config;
pub mod errors;
pub mod result_ext;
pub mod state;

pub use config::AppConfig;
pub use errors::{ServiceError, ServiceResult};
pub use state::{ConnectionState, InitializationState};
