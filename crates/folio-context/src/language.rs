//! Language detection with manual override.
//!
//! The process locale (`LC_ALL`, `LC_MESSAGES`, `LANG`) plays the part of the
//! browser language. Only the languages the site is written in are accepted.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::LanguageSource;

const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_MESSAGES", "LANG"];

/// A language the site content is available in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    #[default]
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Es, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    /// Region used when only the bare language is known
    pub fn default_full_code(&self) -> &'static str {
        match self {
            Self::Es => "es-ES",
            Self::En => "en-US",
        }
    }

    /// Parse a language tag such as `es`, `es-MX` or `en_GB.UTF-8`.
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = normalize_tag(tag)
            .split('-')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        Self::ALL.into_iter().find(|lang| lang.code() == primary)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Turn a POSIX locale (`es_ES.UTF-8@euro`) into a BCP 47 style tag (`es-ES`).
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('_', "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageDetection {
    Browser,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub language: Language,
    /// Full tag, e.g. "es-MX"
    pub full_code: String,
    pub is_manual: bool,
    pub detection_method: LanguageDetection,
}

impl LanguageInfo {
    pub fn detected(language: Language, full_code: impl Into<String>) -> Self {
        Self {
            language,
            full_code: full_code.into(),
            is_manual: false,
            detection_method: LanguageDetection::Browser,
        }
    }

    pub fn manual(language: Language) -> Self {
        Self {
            language,
            full_code: language.default_full_code().to_string(),
            is_manual: true,
            detection_method: LanguageDetection::Manual,
        }
    }
}

impl Default for LanguageInfo {
    fn default() -> Self {
        Self::detected(Language::En, Language::En.default_full_code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    #[error("Unsupported language: {0}")]
    Unsupported(String),
    #[error("Language detection failed: {0}")]
    Detection(String),
}

/// Language source backed by the process locale.
#[derive(Debug)]
pub struct SystemLanguageSource {
    locale_tag: Option<String>,
    fallback: Mutex<Language>,
    manual: Mutex<Option<Language>>,
}

impl SystemLanguageSource {
    /// Read the locale from the environment.
    pub fn from_env() -> Self {
        let tag = LOCALE_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty() && value != "C" && value != "POSIX");
        Self::with_locale(tag.as_deref())
    }

    /// Use an explicit locale tag instead of the environment.
    pub fn with_locale(tag: Option<&str>) -> Self {
        Self {
            locale_tag: tag.map(normalize_tag).filter(|t| !t.is_empty()),
            fallback: Mutex::new(Language::default()),
            manual: Mutex::new(None),
        }
    }

    fn detect(&self) -> LanguageInfo {
        match self.locale_tag.as_deref() {
            Some(tag) => match Language::parse(tag) {
                Some(language) if tag.contains('-') => LanguageInfo::detected(language, tag),
                Some(language) => LanguageInfo::detected(language, language.default_full_code()),
                None => {
                    let fallback = *self.fallback.lock();
                    tracing::debug!("Locale '{}' not supported, using {}", tag, fallback);
                    LanguageInfo::detected(fallback, fallback.default_full_code())
                }
            },
            None => {
                let fallback = *self.fallback.lock();
                LanguageInfo::detected(fallback, fallback.default_full_code())
            }
        }
    }
}

impl LanguageSource for SystemLanguageSource {
    fn current_language(&self) -> Result<LanguageInfo, LanguageError> {
        match *self.manual.lock() {
            Some(language) => Ok(LanguageInfo::manual(language)),
            None => Ok(self.detect()),
        }
    }

    fn set_manual_language(&self, code: &str) -> Result<(), LanguageError> {
        let language =
            Language::parse(code).ok_or_else(|| LanguageError::Unsupported(code.to_string()))?;
        *self.manual.lock() = Some(language);
        tracing::info!("Language manually set to {}", language);
        Ok(())
    }

    fn reset_to_automatic(&self) -> Result<(), LanguageError> {
        *self.manual.lock() = None;
        Ok(())
    }

    fn set_default_language(&self, language: Language) {
        *self.fallback.lock() = language;
    }

    fn reset_default_language(&self) {
        *self.fallback.lock() = Language::default();
    }
}
