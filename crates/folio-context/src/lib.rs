//! User context aggregation: who the visitor is, where, in which language,
//! timezone and weather, with one event stream for every change.

pub mod error;
pub mod event;
pub mod language;
pub mod service;
pub mod sources;
pub mod state;
pub mod timezone;

pub use error::ContextError;
pub use event::{
    ContextEvent, ContextEventData, ContextEventKind, Listener, Subscribers, Subscription,
};
pub use language::{
    Language, LanguageDetection, LanguageError, LanguageInfo, SystemLanguageSource,
};
pub use service::{ContextSources, InitOptions, UserContextService, DEFAULT_TIMEOUT};
pub use sources::{
    CitySearchSource, GeocodingSource, GeolocationSource, LanguageSource, TimezoneSource,
    WeatherSource,
};
pub use state::{ContextPhase, LocationDetection, UserContextState, UserLocation};
pub use timezone::{GeoTimezoneSource, SystemTimezoneSource};
