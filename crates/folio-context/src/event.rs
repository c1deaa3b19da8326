//! State-change events and the listener registry.
//!
//! Delivery is synchronous and in emission order. A listener that returns an
//! error or panics is skipped; the remaining listeners still see the event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use folio_weather::{CityResult, TimezoneInfo, WeatherInfo};
use parking_lot::Mutex;
use serde::Serialize;

use crate::language::LanguageInfo;
use crate::state::{UserContextState, UserLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextEventKind {
    Location,
    City,
    Timezone,
    Weather,
    Language,
    Initialized,
}

/// The state fields a single event carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextEventData {
    Location(Option<UserLocation>),
    City(Option<CityResult>),
    Timezone(Option<TimezoneInfo>),
    Weather(Option<WeatherInfo>),
    Language(LanguageInfo),
    Initialized(Box<UserContextState>),
}

impl ContextEventData {
    pub fn kind(&self) -> ContextEventKind {
        match self {
            Self::Location(_) => ContextEventKind::Location,
            Self::City(_) => ContextEventKind::City,
            Self::Timezone(_) => ContextEventKind::Timezone,
            Self::Weather(_) => ContextEventKind::Weather,
            Self::Language(_) => ContextEventKind::Language,
            Self::Initialized(_) => ContextEventKind::Initialized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEvent {
    #[serde(rename = "type")]
    pub kind: ContextEventKind,
    pub data: ContextEventData,
    pub timestamp: DateTime<Utc>,
}

impl ContextEvent {
    pub fn new(data: ContextEventData) -> Self {
        Self {
            kind: data.kind(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// A state-change callback. Errors are logged at debug level and dropped.
pub type Listener = Arc<dyn Fn(&ContextEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Ordered listener list shared with outstanding [`Subscription`] handles.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.len())
            .finish()
    }
}

impl Subscribers {
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ContextEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every listener registered at the time of the call.
    ///
    /// Returns the number of listeners that handled it without error.
    pub fn emit(&self, event: &ContextEvent) -> usize {
        // Release the lock before calling out so listeners may (un)subscribe
        let listeners: Vec<(u64, Listener)> = self.inner.lock().listeners.clone();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::debug!("Listener {} failed on {:?} event: {:#}", id, event.kind, e);
                }
                Err(_) => {
                    tracing::debug!("Listener {} panicked on {:?} event", id, event.kind);
                }
            }
        }
        delivered
    }

    /// Drop every listener. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        self.inner.lock().listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        registry.listeners.len() != before
    }
}
