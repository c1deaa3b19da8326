//! Aggregated user context state and the initialization state machine.

use folio_weather::{CityResult, Position, TimezoneInfo, WeatherInfo};
use serde::{Deserialize, Serialize};

use crate::language::LanguageInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationDetection {
    /// From a geolocation fix
    Auto,
    /// Synthesized from a city the user picked
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub position: Position,
    pub detection_method: LocationDetection,
}

/// Everything known about the visitor.
///
/// Absent optional fields are the degradation signal: a source that failed
/// or was never configured leaves its field empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContextState {
    pub location: Option<UserLocation>,
    pub city: Option<CityResult>,
    pub timezone: Option<TimezoneInfo>,
    pub weather: Option<WeatherInfo>,
    pub language: LanguageInfo,
    pub is_initialized: bool,
}

impl UserContextState {
    /// Fresh state: language only.
    pub fn new(language: LanguageInfo) -> Self {
        Self {
            location: None,
            city: None,
            timezone: None,
            weather: None,
            language,
            is_initialized: false,
        }
    }
}

/// Lifecycle of a user context service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPhase {
    #[default]
    Uninitialized,
    Initializing,
    Initialized,
    /// Initialized, but an optional source is missing or failed
    PartiallyInitialized,
}

impl ContextPhase {
    /// True if an initialization run may start.
    ///
    /// `Initializing` counts: it is only observable after a run was abandoned mid-way.
    pub fn can_start_initialization(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Initializing)
    }

    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Initialized | Self::PartiallyInitialized)
    }

    /// State once the initialization run starts.
    pub fn on_initialization_started(self) -> Self {
        Self::Initializing
    }

    /// State after an initialization run completes.
    pub fn on_initialization_done(self, degraded: bool) -> Self {
        if degraded {
            Self::PartiallyInitialized
        } else {
            Self::Initialized
        }
    }

    /// State after an initialization run is aborted by a fatal error.
    pub fn on_initialization_failed(self) -> Self {
        Self::Uninitialized
    }

    pub fn on_reset(self) -> Self {
        Self::Uninitialized
    }
}
