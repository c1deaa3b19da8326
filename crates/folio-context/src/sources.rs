//! Collaborator traits consumed by the user context service, and their
//! implementations for the HTTP clients in `folio-weather`.
//!
//! Every source fails independently. The service decides which failures are
//! absorbed and which reach the caller.

use async_trait::async_trait;
use folio_weather::{
    CityInfo, CityResult, GeolocationError, IpLocator, NominatimClient, OpenMeteoClient, Position,
    PositionOptions, RequestOptions, SourceError, TimezoneInfo, WeatherInfo,
};

use crate::language::{Language, LanguageError, LanguageInfo};

/// Where the user is right now.
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    async fn get_position(&self, options: &PositionOptions) -> Result<Position, GeolocationError>;
}

/// Coordinates to city.
#[async_trait]
pub trait GeocodingSource: Send + Sync {
    async fn resolve_city(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<CityInfo, SourceError>;
}

/// Free-text city lookup.
#[async_trait]
pub trait CitySearchSource: Send + Sync {
    async fn search_cities(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CityResult>, SourceError>;
}

#[async_trait]
pub trait TimezoneSource: Send + Sync {
    /// The zone of the machine the user is on. Never fails.
    fn current_timezone(&self) -> TimezoneInfo;

    /// The zone observed at a point.
    async fn timezone_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<TimezoneInfo, SourceError>;
}

/// Detected language with a manual override.
///
/// Implementations use interior mutability: the service only holds a shared handle.
pub trait LanguageSource: Send + Sync {
    fn current_language(&self) -> Result<LanguageInfo, LanguageError>;

    fn set_manual_language(&self, code: &str) -> Result<(), LanguageError>;

    fn reset_to_automatic(&self) -> Result<(), LanguageError>;

    /// Language to report when the detected one is unsupported.
    fn set_default_language(&self, _language: Language) {}

    /// Undo [`set_default_language`](Self::set_default_language).
    fn reset_default_language(&self) {}
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn weather_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<WeatherInfo, SourceError>;
}

#[async_trait]
impl GeolocationSource for IpLocator {
    async fn get_position(&self, options: &PositionOptions) -> Result<Position, GeolocationError> {
        self.locate(options).await
    }
}

#[async_trait]
impl GeocodingSource for NominatimClient {
    async fn resolve_city(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<CityInfo, SourceError> {
        self.reverse(latitude, longitude, options).await
    }
}

#[async_trait]
impl CitySearchSource for NominatimClient {
    async fn search_cities(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CityResult>, SourceError> {
        self.search(text, options).await
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn weather_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<WeatherInfo, SourceError> {
        self.current_weather(latitude, longitude, options).await
    }
}
