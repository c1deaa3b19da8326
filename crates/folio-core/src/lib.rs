pub mod config;
pub mod error;

pub use config::{
    Config, ContextConfig, EndpointsConfig, GeocodingConfig, TemperatureUnit, ValidationResult,
    WeatherConfig, SUPPORTED_LANGUAGES,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError};

use anyhow::Result;

/// Initialize logging for the application
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Folio core initialized");
    Ok(())
}
