//! User context service: one owner for language, position, city, timezone
//! and weather, filled in from independently failing sources.
//!
//! Initialization runs strictly in order, since each step needs the result
//! of the previous one:
//!
//! 1. language (fatal if the language source itself errors)
//! 2. position, bounded by `InitOptions::timeout`; on failure fall back to
//!    the system timezone and stop here
//! 3. city from the position
//! 4. timezone from the position
//! 5. weather, best effort, when a weather source is configured
//!
//! Every field write emits exactly one event before any later field is touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::ContextConfig;
use folio_weather::{
    CityResult, Coordinates, GeolocationError, Position, PositionOptions, RequestOptions,
    WeatherInfo,
};
use tracing::instrument;

use crate::error::ContextError;
use crate::event::{ContextEvent, ContextEventData, Subscribers, Subscription};
use crate::language::{Language, LanguageInfo};
use crate::sources::{
    CitySearchSource, GeocodingSource, GeolocationSource, LanguageSource, TimezoneSource,
    WeatherSource,
};
use crate::state::{ContextPhase, LocationDetection, UserContextState, UserLocation};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Options for [`UserContextService::initialize_from_browser`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitOptions {
    pub enable_geolocation: bool,
    /// Bounds position acquisition; passed on to the other sources as advice
    pub timeout: Duration,
    /// Language to use when the detected one is unsupported. Stays set on
    /// the language source until [`UserContextService::reset`].
    pub default_language: Option<Language>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            enable_geolocation: true,
            timeout: DEFAULT_TIMEOUT,
            default_language: None,
        }
    }
}

impl From<&ContextConfig> for InitOptions {
    fn from(config: &ContextConfig) -> Self {
        Self {
            enable_geolocation: config.enable_geolocation,
            timeout: Duration::from_millis(config.geolocation_timeout_ms),
            default_language: config.default_language.as_deref().and_then(Language::parse),
        }
    }
}

/// The collaborators a service is built from. City search and weather are optional.
pub struct ContextSources {
    pub geolocation: Arc<dyn GeolocationSource>,
    pub geocoding: Arc<dyn GeocodingSource>,
    pub timezone: Arc<dyn TimezoneSource>,
    pub language: Arc<dyn LanguageSource>,
    pub city_search: Option<Arc<dyn CitySearchSource>>,
    pub weather: Option<Arc<dyn WeatherSource>>,
}

pub struct UserContextService {
    geolocation: Arc<dyn GeolocationSource>,
    geocoding: Arc<dyn GeocodingSource>,
    timezone: Arc<dyn TimezoneSource>,
    language: Arc<dyn LanguageSource>,
    city_search: Option<Arc<dyn CitySearchSource>>,
    weather: Option<Arc<dyn WeatherSource>>,
    state: UserContextState,
    phase: ContextPhase,
    subscribers: Subscribers,
    request_timeout: Duration,
}

impl std::fmt::Debug for UserContextService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserContextService")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("has_city_search", &self.city_search.is_some())
            .field("has_weather", &self.weather.is_some())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

impl UserContextService {
    pub fn new(sources: ContextSources) -> Self {
        let language = read_language_or_default(sources.language.as_ref());

        Self {
            geolocation: sources.geolocation,
            geocoding: sources.geocoding,
            timezone: sources.timezone,
            language: sources.language,
            city_search: sources.city_search,
            weather: sources.weather,
            state: UserContextState::new(language),
            phase: ContextPhase::default(),
            subscribers: Subscribers::default(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Detect everything that can be detected and return the resulting state.
    ///
    /// Only a failing language source is reported as an error. Other source
    /// failures leave their field empty and are visible through
    /// [`phase`](Self::phase). Calling this again once initialized returns
    /// the current state without re-running; use [`reset`](Self::reset) first.
    #[instrument(skip(self), level = "info")]
    pub async fn initialize_from_browser(
        &mut self,
        options: InitOptions,
    ) -> Result<UserContextState, ContextError> {
        if !self.phase.can_start_initialization() {
            tracing::debug!("User context already initialized ({:?})", self.phase);
            return Ok(self.current_state());
        }

        if self.phase == ContextPhase::Initializing {
            tracing::debug!("Discarding fields from an abandoned initialization");
            self.state = UserContextState::new(self.state.language.clone());
        }

        self.phase = self.phase.on_initialization_started();
        self.request_timeout = options.timeout;
        let mut degraded = self.city_search.is_none() || self.weather.is_none();

        if let Some(language) = options.default_language {
            self.language.set_default_language(language);
        }

        let language = match self.language.current_language() {
            Ok(language) => language,
            Err(e) => {
                self.phase = self.phase.on_initialization_failed();
                tracing::error!("Language detection failed: {}", e);
                return Err(ContextError::InvalidLanguage(e.to_string()));
            }
        };
        self.state.language = language.clone();
        self.emit(ContextEventData::Language(language));

        let position = if options.enable_geolocation {
            match self.acquire_position(options.timeout).await {
                Ok(position) => Some(position),
                Err(e) => {
                    tracing::warn!("{}; using system timezone", e);
                    degraded = true;
                    None
                }
            }
        } else {
            tracing::debug!("Geolocation disabled; using system timezone");
            None
        };

        match position {
            Some(position) => {
                let coordinates = position.coordinates;
                let location = UserLocation {
                    position,
                    detection_method: LocationDetection::Auto,
                };
                self.state.location = Some(location.clone());
                self.emit(ContextEventData::Location(Some(location)));

                degraded |= !self.resolve_city(coordinates).await;
                degraded |= !self.resolve_timezone(coordinates).await;
                if self.weather.is_some() {
                    degraded |= !self.fetch_weather_best_effort(coordinates).await;
                }
            }
            None => self.apply_system_timezone(),
        }

        self.state.is_initialized = true;
        self.phase = self.phase.on_initialization_done(degraded);
        let snapshot = self.current_state();
        self.emit(ContextEventData::Initialized(Box::new(snapshot.clone())));

        tracing::info!(
            "User context initialized ({:?}): city={}, timezone={}",
            self.phase,
            snapshot.city.as_ref().map_or("-", |c| c.formatted.as_str()),
            snapshot.timezone.as_ref().map_or("-", |t| t.timezone.as_str()),
        );
        Ok(snapshot)
    }

    /// Switch to a city the user picked.
    ///
    /// Updates city, then timezone, then weather (best effort), then the
    /// location if one was already known. Does not touch `is_initialized`.
    #[instrument(skip(self, city), fields(city = %city.city), level = "info")]
    pub async fn set_city(&mut self, city: CityResult) -> Result<(), ContextError> {
        let coordinates = city.coordinates;
        if !coordinates.is_valid() {
            return Err(ContextError::InvalidCity(format!(
                "'{}' has no usable coordinates ({}, {})",
                city.city, coordinates.latitude, coordinates.longitude
            )));
        }

        self.state.city = Some(city.clone());
        self.emit(ContextEventData::City(Some(city)));

        let timezone = match self
            .timezone
            .timezone_for_coordinates(coordinates.latitude, coordinates.longitude)
            .await
        {
            Ok(timezone) => timezone.into_manual().with_coordinates(coordinates),
            Err(e) => {
                tracing::warn!("{}", ContextError::TimezoneFailed(e.to_string()));
                self.timezone.current_timezone()
            }
        };
        self.state.timezone = Some(timezone.clone());
        self.emit(ContextEventData::Timezone(Some(timezone)));

        if self.weather.is_some() {
            self.fetch_weather_best_effort(coordinates).await;
        }

        if self.state.location.is_some() {
            let location = UserLocation {
                position: Position {
                    coordinates,
                    accuracy: 0.0,
                    timestamp: Utc::now(),
                },
                detection_method: LocationDetection::Manual,
            };
            self.state.location = Some(location.clone());
            self.emit(ContextEventData::Location(Some(location)));
        }

        Ok(())
    }

    /// Search cities in the current language.
    #[instrument(skip(self), level = "info")]
    pub async fn search_cities(&self, query: &str) -> Result<Vec<CityResult>, ContextError> {
        let source = self.city_search.as_ref().ok_or_else(|| {
            ContextError::CitySearchFailed("no city search source configured".to_string())
        })?;

        source
            .search_cities(query, &self.request_options())
            .await
            .map_err(|e| ContextError::CitySearchFailed(format!("Failed to search cities: {}", e)))
    }

    /// Override the detected language. State is untouched on failure.
    pub fn set_language(&mut self, code: &str) -> Result<LanguageInfo, ContextError> {
        self.language
            .set_manual_language(code)
            .map_err(|e| ContextError::InvalidLanguage(e.to_string()))?;
        self.reload_language()
    }

    /// Drop the manual override and go back to the detected language.
    pub fn reset_language_to_auto(&mut self) -> Result<LanguageInfo, ContextError> {
        self.language
            .reset_to_automatic()
            .map_err(|e| ContextError::InvalidLanguage(e.to_string()))?;
        self.reload_language()
    }

    /// Re-fetch weather for the current location, or the chosen city.
    ///
    /// Unlike the fetches inside initialization and `set_city`, a failure here
    /// is reported and leaves the state and event stream untouched.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh_weather(&mut self) -> Result<WeatherInfo, ContextError> {
        if !self.phase.is_initialized() {
            return Err(ContextError::NotInitialized);
        }

        let source = self.weather.as_ref().ok_or_else(|| {
            ContextError::WeatherFailed("no weather source configured".to_string())
        })?;

        let coordinates = self.known_coordinates().ok_or_else(|| {
            ContextError::WeatherFailed("no location or city to fetch weather for".to_string())
        })?;

        let weather = source
            .weather_for_coordinates(
                coordinates.latitude,
                coordinates.longitude,
                &self.request_options(),
            )
            .await
            .map_err(|e| ContextError::WeatherFailed(e.to_string()))?;

        self.state.weather = Some(weather.clone());
        self.emit(ContextEventData::Weather(Some(weather.clone())));
        Ok(weather)
    }

    /// Register a listener for every subsequent state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ContextEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// An independent copy of the current state.
    pub fn current_state(&self) -> UserContextState {
        self.state.clone()
    }

    pub fn phase(&self) -> ContextPhase {
        self.phase
    }

    /// Back to construction defaults: language re-read, everything else
    /// cleared, all listeners dropped. A default language set through
    /// [`InitOptions`] is forgotten.
    pub fn reset(&mut self) {
        self.language.reset_default_language();
        let language = read_language_or_default(self.language.as_ref());
        self.state = UserContextState::new(language);
        self.subscribers.clear();
        self.phase = self.phase.on_reset();
        self.request_timeout = DEFAULT_TIMEOUT;
        tracing::debug!("User context reset");
    }

    async fn acquire_position(&self, timeout: Duration) -> Result<Position, ContextError> {
        let options = PositionOptions {
            timeout,
            ..PositionOptions::default()
        };

        let request = self.geolocation.get_position(&options);
        let result = tokio::time::timeout(timeout, request)
            .await
            .unwrap_or(Err(GeolocationError::Timeout));

        result.map_err(|e| ContextError::GeolocationFailed(e.to_string()))
    }

    /// Returns false if the geocoder failed; the city is cleared in that case.
    async fn resolve_city(&mut self, coordinates: Coordinates) -> bool {
        let result = self
            .geocoding
            .resolve_city(
                coordinates.latitude,
                coordinates.longitude,
                &self.request_options(),
            )
            .await;

        let (city, ok) = match result {
            Ok(info) => (Some(CityResult::from_info(info, coordinates)), true),
            Err(e) => {
                tracing::warn!("{}", ContextError::GeocodingFailed(e.to_string()));
                (None, false)
            }
        };

        self.state.city = city.clone();
        self.emit(ContextEventData::City(city));
        ok
    }

    /// Returns false if the lookup failed and the system timezone was used instead.
    async fn resolve_timezone(&mut self, coordinates: Coordinates) -> bool {
        let (timezone, ok) = match self
            .timezone
            .timezone_for_coordinates(coordinates.latitude, coordinates.longitude)
            .await
        {
            Ok(timezone) => (timezone, true),
            Err(e) => {
                tracing::warn!("{}", ContextError::TimezoneFailed(e.to_string()));
                (self.timezone.current_timezone(), false)
            }
        };

        self.state.timezone = Some(timezone.clone());
        self.emit(ContextEventData::Timezone(Some(timezone)));
        ok
    }

    /// Always emits a weather event, with `None` on failure. Returns false on failure.
    async fn fetch_weather_best_effort(&mut self, coordinates: Coordinates) -> bool {
        let Some(source) = self.weather.clone() else {
            return false;
        };

        let weather = match source
            .weather_for_coordinates(
                coordinates.latitude,
                coordinates.longitude,
                &self.request_options(),
            )
            .await
        {
            Ok(weather) => Some(weather),
            Err(e) => {
                tracing::warn!("{}", ContextError::WeatherFailed(e.to_string()));
                None
            }
        };

        let ok = weather.is_some();
        self.state.weather = weather.clone();
        self.emit(ContextEventData::Weather(weather));
        ok
    }

    fn apply_system_timezone(&mut self) {
        let timezone = self.timezone.current_timezone();
        self.state.timezone = Some(timezone.clone());
        self.emit(ContextEventData::Timezone(Some(timezone)));
    }

    fn reload_language(&mut self) -> Result<LanguageInfo, ContextError> {
        let language = self
            .language
            .current_language()
            .map_err(|e| ContextError::InvalidLanguage(e.to_string()))?;

        self.state.language = language.clone();
        self.emit(ContextEventData::Language(language.clone()));
        Ok(language)
    }

    fn known_coordinates(&self) -> Option<Coordinates> {
        self.state
            .location
            .as_ref()
            .map(|l| l.position.coordinates)
            .or_else(|| self.state.city.as_ref().map(|c| c.coordinates))
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .with_timeout(self.request_timeout)
            .with_language(self.state.language.language.code())
    }

    fn emit(&self, data: ContextEventData) {
        let event = ContextEvent::new(data);
        tracing::trace!("Emitting {:?} event", event.kind);
        self.subscribers.emit(&event);
    }
}

fn read_language_or_default(source: &dyn LanguageSource) -> LanguageInfo {
    source.current_language().unwrap_or_else(|e| {
        tracing::warn!("Language detection failed, defaulting to English: {}", e);
        LanguageInfo::default()
    })
}
