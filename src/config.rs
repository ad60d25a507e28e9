//! Configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::env::VarError;
use std::time::Duration;

use tracing::warn;

use crate::consts::{DEFAULT_PREVIEW_LIMIT, GRID_STEP, MAX_ZOOM, MIN_ZOOM, TRIGGER_POLL_INTERVAL_MS};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but its value could not be parsed.
    #[error("config parse failed: {key}={value}")]
    Parse { key: String, value: String },

    /// A required variable is not set.
    #[error("missing config: env var {0} not set")]
    Missing(String),
}

/// Canvas behaviour settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub grid_step: f64,
    pub snap_to_grid: bool,
    pub preview_limit: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            grid_step: GRID_STEP,
            snap_to_grid: true,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl CanvasConfig {
    /// Build canvas config from environment variables.
    ///
    /// Optional:
    /// - `FLOWCANVAS_MIN_ZOOM`: default 0.1
    /// - `FLOWCANVAS_MAX_ZOOM`: default 4.0
    /// - `FLOWCANVAS_GRID_STEP`: default 20
    /// - `FLOWCANVAS_SNAP_TO_GRID`: `true` (default) or `false`
    /// - `FLOWCANVAS_PREVIEW_LIMIT`: default 4
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if a set variable is malformed or a zoom limit
    /// is not positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let min_zoom = parse_positive(&lookup, "FLOWCANVAS_MIN_ZOOM", defaults.min_zoom)?;
        let max_zoom = parse_positive(&lookup, "FLOWCANVAS_MAX_ZOOM", defaults.max_zoom)?;
        let grid_step = parse_or(&lookup, "FLOWCANVAS_GRID_STEP", defaults.grid_step)?;
        let snap_to_grid = parse_bool(&lookup, "FLOWCANVAS_SNAP_TO_GRID", defaults.snap_to_grid)?;
        let preview_limit = parse_or(&lookup, "FLOWCANVAS_PREVIEW_LIMIT", defaults.preview_limit)?;
        Ok(Self { min_zoom, max_zoom, grid_step, snap_to_grid, preview_limit })
    }
}

/// REST backend and polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub trigger_poll_ms: u64,
}

impl BackendConfig {
    /// Config for `base_url` with default timeouts.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            trigger_poll_ms: TRIGGER_POLL_INTERVAL_MS,
        }
    }

    /// Build backend config from environment variables.
    ///
    /// Required:
    /// - `FLOWCANVAS_API_BASE_URL`
    ///
    /// Optional:
    /// - `FLOWCANVAS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FLOWCANVAS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `FLOWCANVAS_TRIGGER_POLL_MS`: default 5000
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] without a base URL, [`ConfigError::Parse`] on
    /// a malformed number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("FLOWCANVAS_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("FLOWCANVAS_API_BASE_URL".into()))?;
        let mut config = Self::new(base_url.trim());
        config.request_timeout_secs =
            parse_or(&lookup, "FLOWCANVAS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        config.connect_timeout_secs =
            parse_or(&lookup, "FLOWCANVAS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;
        config.trigger_poll_ms = parse_or(&lookup, "FLOWCANVAS_TRIGGER_POLL_MS", TRIGGER_POLL_INTERVAL_MS)?;
        Ok(config)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.trigger_poll_ms.max(1))
    }
}

fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) => Some(v),
        Err(VarError::NotPresent) => None,
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable env var");
            None
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Parse { key: key.into(), value: raw })
}

fn parse_positive<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Parse { key: key.into(), value: value.to_string() })
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Parse { key: key.into(), value: raw }),
    }
}
