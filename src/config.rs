// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the spam shield.
//!
//! Evaluation settings come from an external key-value settings store
//! through [`SettingsSource`]. Missing or unparseable values fall back to
//! the defaults below and are never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tracing::warn;

/// Configuration for the spam shield service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Evaluation settings used when no settings store overrides them
    #[serde(default)]
    pub shield: ShieldConfig,

    /// Event log configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings read by the validator, immutable for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldConfig {
    /// Master switch (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum seconds between form render and submit (default: 1)
    #[serde(default = "default_min_submit_seconds")]
    pub min_submit_seconds: i64,

    /// Rate limit window in seconds (default: 10)
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: i64,

    /// SameSite attribute for the probe cookie (default: Lax)
    #[serde(default)]
    pub cookie_same_site: SameSite,

    /// Outcome when the rate limit count cannot be read (default: open)
    #[serde(default)]
    pub count_failure_mode: FailMode,
}

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Case-insensitive parse of `Strict`, `Lax` or `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

/// What to do when the event store cannot answer a count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Allow the request
    #[default]
    Open,
    /// Block the request as rate limited
    Closed,
}

impl FailMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Event log configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON-lines log path; events stay in memory when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_min_submit_seconds() -> i64 {
    1
}

fn default_rate_limit_window_seconds() -> i64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            shield: ShieldConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            min_submit_seconds: default_min_submit_seconds(),
            rate_limit_window_seconds: default_rate_limit_window_seconds(),
            cookie_same_site: SameSite::default(),
            count_failure_mode: FailMode::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

/// Settings keys understood by [`ShieldConfig::load`].
pub mod keys {
    pub const ENABLED: &str = "enabled";
    pub const MIN_SUBMIT_TIME: &str = "min_submit_time";
    pub const RATE_LIMIT_WINDOW: &str = "rate_limit_window";
    pub const SAMESITE: &str = "samesite";
    pub const COUNT_FAILURE_MODE: &str = "count_failure_mode";
}

/// Key-value settings reader owned by the surrounding application.
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads `SPAMSHIELD_<KEY>` environment variables on every lookup.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings;

impl EnvSettings {
    fn var_name(key: &str) -> String {
        format!("SPAMSHIELD_{}", key.to_ascii_uppercase())
    }
}

impl SettingsSource for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// In-process settings an admin layer can update at runtime.
#[derive(Debug, Default)]
pub struct SharedSettings {
    values: RwLock<HashMap<String, String>>,
}

impl SharedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.write().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    // Every write is a single insert or remove, so a poisoned map is intact.
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.values.write().unwrap_or_else(|poisoned| {
            warn!("Settings lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl SettingsSource for SharedSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl ShieldConfig {
    /// Snapshot the settings store, using defaults for anything absent.
    pub fn load(settings: &dyn SettingsSource) -> Self {
        Self::load_with_defaults(settings, &Self::default())
    }

    /// Snapshot the settings store over explicit fallbacks.
    pub fn load_with_defaults(settings: &dyn SettingsSource, defaults: &ShieldConfig) -> Self {
        Self {
            enabled: settings
                .get(keys::ENABLED)
                .map(|v| v.trim() == "yes")
                .unwrap_or(defaults.enabled),
            min_submit_seconds: settings
                .get(keys::MIN_SUBMIT_TIME)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.min_submit_seconds),
            rate_limit_window_seconds: settings
                .get(keys::RATE_LIMIT_WINDOW)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.rate_limit_window_seconds),
            cookie_same_site: settings
                .get(keys::SAMESITE)
                .and_then(|v| SameSite::parse(&v))
                .unwrap_or(defaults.cookie_same_site),
            count_failure_mode: settings
                .get(keys::COUNT_FAILURE_MODE)
                .and_then(|v| FailMode::parse(&v))
                .unwrap_or(defaults.count_failure_mode),
        }
    }

    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_seconds.max(0) as u64)
    }
}
