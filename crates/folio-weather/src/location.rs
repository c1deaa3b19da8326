//! Coarse position lookup from the caller's public IP.
//! Uses an ip-api compatible endpoint - no API key, no permission prompt.

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::types::{Coordinates, GeolocationError, Position, PositionOptions, SourceError};

/// IP lookups are city-level at best.
const IP_ACCURACY_METERS: f64 = 5000.0;

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    base_url: String,
}

impl IpLocator {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up the current position. `options.timeout` bounds the request.
    #[instrument(skip(self), level = "info")]
    pub async fn locate(&self, options: &PositionOptions) -> Result<Position, GeolocationError> {
        let url = format!("{}/json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("fields", "status,message,lat,lon")])
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeolocationError::Timeout
                } else {
                    GeolocationError::PositionUnavailable(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::FORBIDDEN => return Err(GeolocationError::PermissionDenied),
            status if !status.is_success() => {
                return Err(GeolocationError::PositionUnavailable(format!(
                    "lookup returned status {}",
                    status
                )))
            }
            _ => {}
        }

        let body: IpApiResponse = response.json().await.map_err(|e| {
            tracing::debug!("IP lookup parse error: {}", e);
            GeolocationError::PositionUnavailable(format!("unreadable response: {}", e))
        })?;

        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| "lookup failed".to_string());
            return Err(GeolocationError::PositionUnavailable(reason));
        }

        let (Some(lat), Some(lon)) = (body.lat, body.lon) else {
            return Err(GeolocationError::PositionUnavailable(
                "response has no coordinates".to_string(),
            ));
        };

        let coordinates = Coordinates::new(lat, lon);
        if !coordinates.is_valid() {
            return Err(GeolocationError::PositionUnavailable(format!(
                "coordinates out of range: {}, {}",
                lat, lon
            )));
        }

        tracing::info!("Located via IP at {}, {}", lat, lon);
        Ok(Position {
            coordinates,
            accuracy: IP_ACCURACY_METERS,
            timestamp: Utc::now(),
        })
    }
}
