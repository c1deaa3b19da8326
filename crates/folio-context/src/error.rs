//! User context error types.

use thiserror::Error;

/// Every failure the user context service reports, tagged by the source
/// or input that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Geolocation failed: {0}")]
    GeolocationFailed(String),

    #[error("Geocoding failed: {0}")]
    GeocodingFailed(String),

    #[error("City search failed: {0}")]
    CitySearchFailed(String),

    #[error("Timezone lookup failed: {0}")]
    TimezoneFailed(String),

    #[error("Weather fetch failed: {0}")]
    WeatherFailed(String),

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),

    #[error("Invalid city: {0}")]
    InvalidCity(String),

    #[error("User context not initialized")]
    NotInitialized,
}

impl ContextError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::GeolocationFailed(_) => "We couldn't detect your location.",
            Self::GeocodingFailed(_) => "We couldn't work out which city you're in.",
            Self::CitySearchFailed(_) => "City search is unavailable right now. Please try again.",
            Self::TimezoneFailed(_) => "We couldn't determine your timezone.",
            Self::WeatherFailed(_) => "Weather is unavailable right now.",
            Self::InvalidLanguage(_) => "That language isn't supported.",
            Self::InvalidCity(_) => "Please pick a city from the list.",
            Self::NotInitialized => "Still loading your settings. Please wait a moment.",
        }
    }

    /// Errors the caller can fix by changing its input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidLanguage(_) | Self::InvalidCity(_))
    }
}

impl From<ContextError> for folio_core::AppError {
    fn from(e: ContextError) -> Self {
        folio_core::AppError::Context(e.to_string())
    }
}
