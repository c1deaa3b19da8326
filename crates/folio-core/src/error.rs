//! Error types shared by the Folio crates.
//!
//! `Display` output is meant for logs. Every enum also has a
//! `user_message()` that is safe to show a visitor.

use thiserror::Error;

/// Anything the binary can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    /// Failure reported by the user context service
    #[error("User context error: {0}")]
    Context(String),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Context(_) => "We couldn't work out your location settings.",
        }
    }
}

/// Transport-level failures talking to a remote source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unreadable response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "You appear to be offline.",
            NetworkError::Timeout => "A lookup took too long.",
            NetworkError::ServerError { status: 429, .. } => {
                "Too many lookups right now. Try again in a minute."
            }
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "A location service is having trouble."
            }
            NetworkError::ServerError { .. } | NetworkError::InvalidResponse(_) => {
                "A location service gave an unexpected answer."
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("Config file unreadable: {0}")]
    Unreadable(String),

    /// The file parsed but failed validation, or did not parse
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Classify an error from `Config::load*`.
    pub fn from_load_error(error: &anyhow::Error) -> Self {
        let detail = format!("{:#}", error);
        if error.chain().any(|cause| cause.is::<std::io::Error>()) {
            ConfigError::Unreadable(detail)
        } else {
            ConfigError::Invalid(detail)
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Unreadable(_) => "The settings file could not be opened.",
            ConfigError::Invalid(_) => "The settings file has a mistake in it.",
        }
    }
}

/// Why a visitor sees no weather.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Weather disabled in configuration")]
    Disabled,

    #[error("Weather source unavailable")]
    Unavailable,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Disabled => "Weather is turned off.",
            WeatherError::Unavailable => "Weather isn't available right now.",
        }
    }
}

/// Map `reqwest` failures onto [`NetworkError`].
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_converts_to_app_error() {
        let app_err: AppError = NetworkError::Timeout.into();
        assert!(matches!(app_err, AppError::Network(NetworkError::Timeout)));
        assert_eq!(app_err.user_message(), "A lookup took too long.");
    }

    #[test]
    fn test_weather_message_propagation() {
        let app_err = AppError::from(WeatherError::Disabled);
        assert_eq!(app_err.user_message(), "Weather is turned off.");
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let server = |status| NetworkError::ServerError {
            status,
            message: String::new(),
        };
        assert!(server(429).user_message().contains("Too many"));
        assert!(server(503).user_message().contains("having trouble"));
        assert!(server(404).user_message().contains("unexpected"));
    }

    #[test]
    fn test_timeout_detection() {
        assert!(NetworkError::Timeout.is_timeout());
        assert!(!NetworkError::ConnectionFailed("reset".into()).is_timeout());
    }

    #[test]
    fn test_config_load_errors_are_classified() {
        let io = anyhow::Error::new(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            .context("Failed to read config file");
        assert!(matches!(ConfigError::from_load_error(&io), ConfigError::Unreadable(_)));

        let parse = anyhow::anyhow!("expected `=`").context("Failed to parse config file");
        let err = ConfigError::from_load_error(&parse);
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("expected `=`")));
    }
}
