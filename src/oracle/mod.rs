pub mod price_oracle;

pub use price_oracle::CachedPriceOracle;
