pub mod rate_limit;
pub mod transport;

pub use rate_limit::RateLimiter;
pub use transport::RpcTransport;
