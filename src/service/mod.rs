pub mod di_container;
pub mod injected;
pub mod market;
pub mod slots;
pub mod traits;

pub use di_container::{ContainerBuilder, ServiceContainer, ServiceSlot};
pub use injected::Injected;
pub use market::{AssetQuote, MarketService};
pub use slots::{CacheSlot, ConfigurationSlot, NetworkTransportSlot, PriceOracleSlot, RateCalculationSlot};
