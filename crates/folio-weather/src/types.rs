use std::time::Duration;

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use folio_core::{NetworkError, ReqwestErrorExt, TemperatureUnit};
use serde::{Deserialize, Serialize};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Stable identifier for places that have no native ID.
    pub fn place_id(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A position fix from a geolocation source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinates: Coordinates,
    /// Radius of uncertainty in meters
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Options for a geolocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub enable_high_accuracy: bool,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            enable_high_accuracy: false,
            maximum_age: Duration::from_secs(300),
        }
    }
}

/// Options threaded through to geocoding, search and weather requests.
///
/// `timeout` is advisory: clients apply it per request, nothing enforces it end to end.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub timeout: Duration,
    /// Language code sent as `accept-language`
    pub language: String,
    /// Maximum number of results for list endpoints
    pub limit: Option<u32>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            language: "en".to_string(),
            limit: None,
        }
    }
}

impl RequestOptions {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Reverse geocoding result, before it is pinned to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityInfo {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub state: Option<String>,
    pub formatted: String,
    /// Native place identifier, when the geocoder has one
    pub place_id: Option<String>,
}

/// A city the user is (or chose to be) in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityResult {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub state: Option<String>,
    pub coordinates: Coordinates,
    pub formatted: String,
    pub place_id: String,
}

impl CityResult {
    /// Pin a geocoding result to the coordinates it was resolved from.
    pub fn from_info(info: CityInfo, coordinates: Coordinates) -> Self {
        let place_id = info
            .place_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| coordinates.place_id());

        Self {
            city: info.city,
            country: info.country,
            country_code: info.country_code,
            state: info.state,
            coordinates,
            formatted: info.formatted,
            place_id,
        }
    }
}

/// How a timezone was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimezoneDetection {
    Browser,
    Geolocation,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimezoneInfo {
    /// IANA name when known (e.g. "Europe/Paris")
    pub timezone: String,
    /// Minutes east of UTC
    pub offset: i32,
    /// e.g. "UTC+02:00"
    pub offset_string: String,
    pub locale: String,
    pub is_manual: bool,
    pub detection_method: TimezoneDetection,
    pub is_dst: Option<bool>,
    pub coordinates: Option<Coordinates>,
}

impl TimezoneInfo {
    /// Build from a fixed offset, with no DST information.
    pub fn from_offset(
        timezone: impl Into<String>,
        offset_minutes: i32,
        locale: impl Into<String>,
        detection_method: TimezoneDetection,
    ) -> Self {
        Self {
            timezone: timezone.into(),
            offset: offset_minutes,
            offset_string: format_offset(offset_minutes),
            locale: locale.into(),
            is_manual: detection_method == TimezoneDetection::Manual,
            detection_method,
            is_dst: None,
            coordinates: None,
        }
    }

    /// Build from an IANA name, resolving offset and DST at `now`.
    /// Returns `None` when the name is not in the tz database.
    pub fn from_iana(
        name: &str,
        now: DateTime<Utc>,
        locale: impl Into<String>,
        detection_method: TimezoneDetection,
    ) -> Option<Self> {
        let tz: Tz = name.parse().ok()?;
        let offset = tz.offset_from_utc_datetime(&now.naive_utc());
        let offset_minutes = offset.fix().local_minus_utc() / 60;
        let is_dst = !offset.dst_offset().is_zero();

        let mut info = Self::from_offset(tz.name(), offset_minutes, locale, detection_method);
        info.is_dst = Some(is_dst);
        Some(info)
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Re-tag this timezone as chosen by the user.
    pub fn into_manual(mut self) -> Self {
        self.detection_method = TimezoneDetection::Manual;
        self.is_manual = true;
        self
    }
}

/// Format minutes east of UTC as "UTC+HH:MM".
pub fn format_offset(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.unsigned_abs();
    format!("UTC{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet, // Freezing drizzle / rain
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Icon name used by the weather widget
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }

    /// Whether precipitation is falling
    pub fn is_precipitating(&self) -> bool {
        matches!(
            self,
            Self::Drizzle
                | Self::Rain
                | Self::HeavyRain
                | Self::Snow
                | Self::Sleet
                | Self::Thunderstorm
        )
    }
}

/// Current weather at a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub condition: WeatherCondition,
    pub is_day: bool,
    /// Resolved unit, never `Auto`
    pub unit: TemperatureUnit,
    pub coordinates: Coordinates,
    pub updated_at: DateTime<Utc>,
}

/// Geolocation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported")]
    NotSupported,
}

/// Errors from the HTTP-backed geocoding, search, weather and timezone sources
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}
