//! Reverse geocoding and city search.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{CityInfo, CityResult, Coordinates, RequestOptions, SourceError};
use folio_core::NetworkError;

const DEFAULT_SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    place_id: Option<u64>,
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl NominatimPlace {
    fn into_city_info(self) -> Option<CityInfo> {
        let addr = self.address?;

        let state = addr.state.clone();
        let country = addr.country.clone().unwrap_or_default();

        // Prefer city > town > village > municipality for the primary place name
        let place = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .or(addr.municipality)
            .or(addr.county)
            .or(addr.state)?;

        let mut parts = vec![place.clone()];
        if let Some(s) = state.as_deref().filter(|s| !s.is_empty() && *s != place) {
            parts.push(s.to_string());
        }
        if !country.is_empty() && country != place {
            parts.push(country.clone());
        }

        Some(CityInfo {
            city: place,
            country,
            country_code: addr.country_code.unwrap_or_default().to_uppercase(),
            state,
            formatted: parts.join(", "),
            place_id: self.place_id.map(|id| id.to_string()),
        })
    }

    fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.lat.as_deref()?.parse().ok()?;
        let lon = self.lon.as_deref()?.parse().ok()?;
        Some(Coordinates::new(lat, lon)).filter(Coordinates::is_valid)
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
    retry: RetryConfig,
    search_limit: u32,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }

    /// Resolve coordinates to the city containing them.
    #[instrument(skip(self, options), level = "info")]
    pub async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
        options: &RequestOptions,
    ) -> Result<CityInfo, SourceError> {
        let url = format!("{}/reverse", self.base_url);
        let params = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("zoom", "10".to_string()),
            ("accept-language", options.language.clone()),
        ];

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&params)
                .timeout(options.timeout)
                .send()
        })
        .await?;

        let place: NominatimPlace = Self::decode(response).await?;
        let info = place.into_city_info().ok_or_else(|| {
            SourceError::NotFound(format!("no place at {}, {}", latitude, longitude))
        })?;

        tracing::info!("Reverse geocoded to: {}", info.formatted);
        Ok(info)
    }

    /// Search cities by free text. A blank query returns no results without a request.
    #[instrument(skip(self, options), level = "info")]
    pub async fn search(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CityResult>, SourceError> {
        let query = text.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        let limit = options.limit.unwrap_or(self.search_limit);
        let params = [
            ("q", query.to_string()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
            ("accept-language", options.language.clone()),
        ];

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&params)
                .timeout(options.timeout)
                .send()
        })
        .await?;

        let places: Vec<NominatimPlace> = Self::decode(response).await?;
        let results: Vec<CityResult> = places
            .into_iter()
            .filter_map(|place| {
                let coordinates = place.coordinates()?;
                let display_name = place.display_name.clone();
                let mut info = place.into_city_info()?;
                if info.formatted.is_empty() {
                    info.formatted = display_name.unwrap_or_default();
                }
                Some(CityResult::from_info(info, coordinates))
            })
            .collect();

        tracing::debug!("City search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SourceError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Network(NetworkError::ServerError {
                status: status.as_u16(),
                message: if status == StatusCode::TOO_MANY_REQUESTS {
                    "Nominatim usage limit reached".to_string()
                } else {
                    message
                },
            }));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}
