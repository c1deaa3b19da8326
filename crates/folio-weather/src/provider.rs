//! Current weather and coordinate timezones from Open-Meteo (no API key).

use std::time::Duration;

use chrono::{NaiveDateTime, TimeZone, Utc};
use folio_core::{NetworkError, TemperatureUnit};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{
    Coordinates, RequestOptions, SourceError, TimezoneDetection, TimezoneInfo, WeatherCondition,
    WeatherInfo,
};

/// Bound for timezone lookups, which take no per-call options.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m,is_day";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: Option<String>,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: i32,
    wind_speed_10m: f64,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct TimezoneResponse {
    timezone: String,
    utc_offset_seconds: i32,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    unit: TemperatureUnit,
    retry: RetryConfig,
    lookup_timeout: Duration,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str, unit: TemperatureUnit) -> Result<Self, SourceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            unit,
            retry: RetryConfig::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt bound for [`timezone_at`](Self::timezone_at).
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// `Auto` resolves to Celsius.
    pub fn resolved_unit(&self) -> TemperatureUnit {
        match self.unit {
            TemperatureUnit::Fahrenheit => TemperatureUnit::Fahrenheit,
            TemperatureUnit::Auto | TemperatureUnit::Celsius => TemperatureUnit::Celsius,
        }
    }

    /// Fetch current conditions at a point.
    #[instrument(skip(self, options), level = "info")]
    pub async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<WeatherInfo, SourceError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let unit = self.resolved_unit();
        let mut params = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
        ];
        if unit == TemperatureUnit::Fahrenheit {
            params.push(("temperature_unit", "fahrenheit".to_string()));
        }

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&params)
                .timeout(options.timeout)
                .send()
        })
        .await?;

        let body: ForecastResponse = decode(response).await?;
        let current = body
            .current
            .ok_or_else(|| SourceError::Parse("response has no current block".to_string()))?;

        // Times are GMT when no timezone is requested
        let updated_at = current
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_else(Utc::now);

        let condition = WeatherCondition::from_wmo_code(current.weather_code);
        tracing::info!(
            "Weather at {}, {}: {} {:.1}",
            latitude,
            longitude,
            condition.description(),
            current.temperature_2m
        );

        Ok(WeatherInfo {
            temperature: current.temperature_2m,
            feels_like: current.apparent_temperature,
            humidity: current.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
            wind_speed: current.wind_speed_10m,
            condition,
            is_day: current.is_day != 0,
            unit,
            coordinates: Coordinates::new(latitude, longitude),
            updated_at,
        })
    }

    /// Resolve the timezone observed at a point.
    #[instrument(skip(self), level = "info")]
    pub async fn timezone_at(
        &self,
        latitude: f64,
        longitude: f64,
        locale: &str,
    ) -> Result<TimezoneInfo, SourceError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let params = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&params)
                .timeout(self.lookup_timeout)
                .send()
        })
        .await?;
        let body: TimezoneResponse = decode(response).await?;

        let coordinates = Coordinates::new(latitude, longitude);
        let info = TimezoneInfo::from_iana(
            &body.timezone,
            Utc::now(),
            locale,
            TimezoneDetection::Geolocation,
        )
        .unwrap_or_else(|| {
            TimezoneInfo::from_offset(
                body.timezone.clone(),
                body.utc_offset_seconds / 60,
                locale,
                TimezoneDetection::Geolocation,
            )
        });

        Ok(info.with_coordinates(coordinates))
    }
}

/// Estimate the timezone from longitude alone: one hour per 15 degrees.
///
/// Named with the POSIX `Etc/GMT` convention, whose sign is inverted
/// (`Etc/GMT-2` is two hours east of UTC).
pub fn longitude_timezone(latitude: f64, longitude: f64, locale: &str) -> TimezoneInfo {
    let hours = (longitude / 15.0).round().clamp(-12.0, 14.0) as i32;
    let name = if hours == 0 {
        "Etc/GMT".to_string()
    } else {
        format!("Etc/GMT{:+}", -hours)
    };

    TimezoneInfo::from_offset(name, hours * 60, locale, TimezoneDetection::Geolocation)
        .with_coordinates(Coordinates::new(latitude, longitude))
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SourceError::Network(NetworkError::ServerError {
            status: status.as_u16(),
            message,
        }));
    }

    response
        .json()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}
