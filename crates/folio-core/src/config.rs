use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Languages the site content is available in.
pub const SUPPORTED_LANGUAGES: &[&str] = &["es", "en"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// User context detection settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Reverse geocoding and city search settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Remote endpoints for location, weather and timezone lookups
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Try to detect the user's position on startup
    #[serde(default = "default_enable_geolocation")]
    pub enable_geolocation: bool,

    /// Upper bound for position acquisition, in milliseconds
    #[serde(default = "default_geolocation_timeout_ms")]
    pub geolocation_timeout_ms: u64,

    /// Language used when the detected one is not supported ("es" or "en")
    #[serde(default)]
    pub default_language: Option<String>,
}

fn default_enable_geolocation() -> bool {
    true
}

fn default_geolocation_timeout_ms() -> u64 {
    10_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enable_geolocation: default_enable_geolocation(),
            geolocation_timeout_ms: default_geolocation_timeout_ms(),
            default_language: None,
        }
    }
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Whether the weather widget fetches anything at all
    pub enabled: bool,

    /// Temperature unit preference
    pub temperature_unit: TemperatureUnit,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature_unit: TemperatureUnit::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim base URL (reverse + search endpoints live below it)
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,

    /// User-Agent sent to Nominatim, which requires an identifying one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of city search results
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    "Folio/0.1.0 (personal portfolio site)".to_string()
}

fn default_search_limit() -> u32 {
    5
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_nominatim_url(),
            user_agent: default_user_agent(),
            search_limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Open-Meteo API base URL (weather and timezone)
    #[serde(default = "default_open_meteo_url")]
    pub open_meteo_url: String,

    /// ip-api compatible geolocation base URL
    #[serde(default = "default_ip_api_url")]
    pub ip_api_url: String,
}

fn default_open_meteo_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_ip_api_url() -> String {
    "http://ip-api.com".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            open_meteo_url: default_open_meteo_url(),
            ip_api_url: default_ip_api_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio");

        Self {
            config_dir,
            context: ContextConfig::default(),
            weather: WeatherConfig::default(),
            geocoding: GeocodingConfig::default(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit file, creating a default one if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.geocoding.nominatim_url,
            "geocoding.nominatim_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.open_meteo_url,
            "endpoints.open_meteo_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.ip_api_url,
            "endpoints.ip_api_url",
            &mut result,
        );

        if self.context.geolocation_timeout_ms == 0 {
            result.add_error(
                "context.geolocation_timeout_ms",
                "Geolocation timeout must be greater than 0",
            );
        } else if self.context.geolocation_timeout_ms > 60_000 {
            result.add_warning(
                "context.geolocation_timeout_ms",
                "Geolocation timeout is unusually long (>60s)",
            );
        }

        if let Some(lang) = &self.context.default_language {
            if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
                result.add_error(
                    "context.default_language",
                    format!(
                        "Unsupported language '{}', expected one of: {}",
                        lang,
                        SUPPORTED_LANGUAGES.join(", ")
                    ),
                );
            }
        }

        if self.geocoding.user_agent.trim().is_empty() {
            result.add_error(
                "geocoding.user_agent",
                "Nominatim requires an identifying User-Agent",
            );
        }

        if self.geocoding.search_limit == 0 {
            result.add_error(
                "geocoding.search_limit",
                "Search limit must be greater than 0",
            );
        } else if self.geocoding.search_limit > 50 {
            result.add_warning(
                "geocoding.search_limit",
                "Nominatim caps results at 50",
            );
        }

        if !self.weather.enabled {
            result.add_warning("weather", "Weather disabled - the widget will stay empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("folio");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.geocoding.nominatim_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "geocoding.nominatim_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.endpoints.open_meteo_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_geolocation_timeout() {
        let mut config = Config::default();
        config.context.geolocation_timeout_ms = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "context.geolocation_timeout_ms"));
    }

    #[test]
    fn test_unsupported_default_language() {
        let mut config = Config::default();
        config.context.default_language = Some("fr".to_string());
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("'fr'")));

        config.context.default_language = Some("es".to_string());
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_weather_disabled_is_warning() {
        let mut config = Config::default();
        config.weather.enabled = false;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(config.context.enable_geolocation);
        assert_eq!(config.context.geolocation_timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/folio\"\n\n[context]\nenable_geolocation = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.context.enable_geolocation);
        assert_eq!(config.context.geolocation_timeout_ms, 10_000);
        assert_eq!(config.geocoding.search_limit, 5);
        assert!(config.weather.enabled);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
