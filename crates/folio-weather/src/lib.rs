//! Network-backed location, geocoding, weather and timezone sources for Folio.
//!
//! Weather and timezones come from Open-Meteo, places from Nominatim and
//! coarse positions from an ip-api compatible endpoint.

pub mod geocode;
pub mod location;
pub mod provider;
pub mod retry;
pub mod types;

pub use geocode::NominatimClient;
pub use location::IpLocator;
pub use provider::{longitude_timezone, OpenMeteoClient, DEFAULT_LOOKUP_TIMEOUT};
pub use retry::RetryConfig;
pub use types::*;
