//! # Runtime Configuration Module
//!
//! Application settings for the dispatch core, loaded from YAML and/or
//! environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `BRRTD_EXPOSE_ERRORS` | `expose_errors` | `true` |
//! | `BRRTD_MAX_RESOLUTION_DEPTH` | `max_resolution_depth` | `32` |
//! | `BRRTD_CACHE_CAPACITY` | `cache_capacity` | `1024` |
//! | `BRRTD_SESSION_COOKIE` | `session.cookie_name` | `ksid` |
//! | `BRRTD_SESSION_KEY_PREFIX` | `session.key_prefix` | `sid:` |
//!
//! Values that do not parse keep whatever was configured before.
//!
//! ## Usage
//!
//! ```rust
//! use brrtdispatch::runtime_config::AppConfig;
//!
//! let config = AppConfig::from_env();
//! assert!(config.max_resolution_depth > 0);
//! ```
//!
//! ## Example YAML
//!
//! ```yaml
//! expose_errors: false
//! cache_capacity: 4096
//! session:
//!   cookie_name: app_sid
//! ```

use crate::registry::DEFAULT_MAX_RESOLUTION_DEPTH;
use crate::session::SessionSettings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Session settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub key_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let settings = SessionSettings::default();
        Self {
            cookie_name: settings.cookie_name,
            key_prefix: settings.key_prefix,
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        SessionSettings {
            cookie_name: config.cookie_name.clone(),
            key_prefix: config.key_prefix.clone(),
        }
    }
}

/// Settings for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Put the full cause chain in 500 bodies (otherwise just the reason phrase)
    pub expose_errors: bool,
    /// Bound on nested dependency resolution
    pub max_resolution_depth: usize,
    /// Content type for text and byte bodies that set none
    pub default_content_type: String,
    /// Entries kept by the in-memory cache
    pub cache_capacity: usize,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            expose_errors: true,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            default_content_type: "text/html; charset=utf-8".to_string(),
            cache_capacity: 1024,
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load YAML from `path`; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid YAML for this shape.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// # Errors
    ///
    /// Fails for YAML that does not describe an `AppConfig`.
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `BRRTD_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("BRRTD_EXPOSE_ERRORS") {
            self.expose_errors = v;
        }
        if let Some(v) = env_parse("BRRTD_MAX_RESOLUTION_DEPTH") {
            self.max_resolution_depth = v;
        }
        if let Some(v) = env_parse("BRRTD_CACHE_CAPACITY") {
            self.cache_capacity = v;
        }
        if let Ok(v) = env::var("BRRTD_SESSION_COOKIE") {
            if !v.is_empty() {
                self.session.cookie_name = v;
            }
        }
        if let Ok(v) = env::var("BRRTD_SESSION_KEY_PREFIX") {
            self.session.key_prefix = v;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
