//! Timezone sources: the local system zone, and zones for arbitrary coordinates.

use async_trait::async_trait;
use chrono::{Local, Utc};
use folio_weather::{
    longitude_timezone, OpenMeteoClient, SourceError, TimezoneDetection, TimezoneInfo,
};

use crate::sources::TimezoneSource;

/// The zone this process runs in, from `TZ` or the local UTC offset.
#[derive(Debug, Clone)]
pub struct SystemTimezoneSource {
    tz_name: Option<String>,
    locale: String,
}

impl SystemTimezoneSource {
    pub fn from_env(locale: impl Into<String>) -> Self {
        let tz_name = std::env::var("TZ").ok();
        Self::new(tz_name.as_deref(), locale)
    }

    pub fn new(tz_name: Option<&str>, locale: impl Into<String>) -> Self {
        Self {
            // POSIX allows a leading ':' before the zone name
            tz_name: tz_name
                .map(|name| name.trim_start_matches(':').trim().to_string())
                .filter(|name| !name.is_empty()),
            locale: locale.into(),
        }
    }

    pub fn current(&self) -> TimezoneInfo {
        let locale = self.locale.as_str();
        if let Some(info) = self.tz_name.as_deref().and_then(|name| {
            TimezoneInfo::from_iana(name, Utc::now(), locale, TimezoneDetection::Browser)
        }) {
            return info;
        }

        let offset_minutes = Local::now().offset().local_minus_utc() / 60;
        let name = if offset_minutes == 0 {
            "UTC".to_string()
        } else {
            folio_weather::format_offset(offset_minutes)
        };
        TimezoneInfo::from_offset(name, offset_minutes, locale, TimezoneDetection::Browser)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

/// System zone for "where am I now", Open-Meteo for coordinates, and the
/// longitude estimate when the lookup is unavailable.
#[derive(Debug, Clone)]
pub struct GeoTimezoneSource {
    system: SystemTimezoneSource,
    lookup: Option<OpenMeteoClient>,
}

impl GeoTimezoneSource {
    pub fn new(system: SystemTimezoneSource, lookup: Option<OpenMeteoClient>) -> Self {
        Self { system, lookup }
    }
}

#[async_trait]
impl TimezoneSource for GeoTimezoneSource {
    fn current_timezone(&self) -> TimezoneInfo {
        self.system.current()
    }

    async fn timezone_for_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<TimezoneInfo, SourceError> {
        let locale = self.system.locale();

        if let Some(client) = &self.lookup {
            match client.timezone_at(latitude, longitude, locale).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    tracing::warn!("Timezone lookup failed, estimating from longitude: {}", e);
                }
            }
        }

        Ok(longitude_timezone(latitude, longitude, locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tz_variable_is_used() {
        let source = SystemTimezoneSource::new(Some(":America/Mexico_City"), "es-MX");
        let tz = source.current();
        assert_eq!(tz.timezone, "America/Mexico_City");
        assert_eq!(tz.detection_method, TimezoneDetection::Browser);
        assert_eq!(tz.locale, "es-MX");
        assert!(!tz.is_manual);
        assert!(tz.coordinates.is_none());
    }

    #[test]
    fn test_unknown_tz_falls_back_to_local_offset() {
        let source = SystemTimezoneSource::new(Some("Not/AZone"), "en-US");
        let tz = source.current();
        assert_eq!(tz.detection_method, TimezoneDetection::Browser);
        assert_eq!(tz.offset, Local::now().offset().local_minus_utc() / 60);
    }

    #[tokio::test]
    async fn test_no_lookup_uses_longitude_estimate() {
        let source = GeoTimezoneSource::new(SystemTimezoneSource::new(Some("UTC"), "en-US"), None);
        let tz = source.timezone_for_coordinates(40.71, -74.0).await.unwrap();
        assert_eq!(tz.offset, -300);
        assert_eq!(tz.locale, "en-US");
    }
}
