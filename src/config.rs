use std::env;

use thiserror::Error;

use crate::locale::{Locale, LocalePrefix};

/// Development fallback for the session signing secret. Never accepted in production.
const LOCAL_SESSION_SECRET: &str = "medibook-local-session-secret";

/// AppConfig
///
/// Holds the gateway's entire configuration state. It is loaded once at startup and
/// never mutated afterwards; the locale settings, public route table and role destinations
/// derived from it are process-wide constants shared by every request.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local session bypass and log format.
    pub env: Env,
    // HMAC secret used to verify session tokens issued by the identity provider.
    pub jwt_secret: String,
    // Locale used when a path carries no (recognized) locale segment.
    pub default_locale: Locale,
    // Whether the default locale may stay unprefixed ("as-needed") or every path
    // must carry a locale segment ("always").
    pub locale_prefix: LocalePrefix,
    // When true, unprefixed requests consult Accept-Language before the default.
    pub locale_detection: bool,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context, used to switch between the development session bypass
/// and the hardened, token-only production setup.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Reasons a configuration could not be assembled from the environment.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("DEFAULT_LOCALE `{0}` is not a supported locale")]
    UnsupportedLocale(String),
    #[error("LOCALE_PREFIX `{0}` must be `always` or `as-needed`")]
    InvalidLocalePrefix(String),
    #[error("LOCALE_DETECTION `{0}` must be `true` or `false`")]
    InvalidFlag(String),
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests and scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_SESSION_SECRET.to_string(),
            default_locale: Locale::En,
            locale_prefix: LocalePrefix::AsNeeded,
            locale_detection: false,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical startup entry point. Reads every parameter from the environment and
    /// implements the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if the environment describes an invalid or incomplete configuration, most
    /// notably a production deployment without `SESSION_JWT_SECRET`.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => panic!("FATAL: {e}"),
        }
    }

    /// Reads and validates the configuration without panicking.
    pub fn try_load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("SESSION_JWT_SECRET"))?,
            Env::Local => env::var("SESSION_JWT_SECRET")
                .unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
        };

        let default_locale = match env::var("DEFAULT_LOCALE") {
            Ok(raw) => Locale::from_segment(raw.trim())
                .ok_or(ConfigError::UnsupportedLocale(raw))?,
            Err(_) => Locale::En,
        };

        let locale_prefix = match env::var("LOCALE_PREFIX") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidLocalePrefix(raw))?,
            Err(_) => LocalePrefix::AsNeeded,
        };

        let locale_detection = match env::var("LOCALE_DETECTION") {
            Ok(raw) => raw
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidFlag(raw))?,
            Err(_) => false,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            env,
            jwt_secret,
            default_locale,
            locale_prefix,
            locale_detection,
            bind_addr,
        })
    }
}
