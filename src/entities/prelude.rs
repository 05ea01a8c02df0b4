pub use super::exchange_rates::Entity as ExchangeRates;
pub use super::metadata::Entity as Metadata;
