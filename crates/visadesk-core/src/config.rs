//! Configuration for visadesk.
//!
//! Settings live in `~/.visadesk/config.yaml`. Every section is optional and
//! falls back to its defaults, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! ```yaml
//! api:
//!   base_url: https://agency.example.com
//!   token_env: VISADESK_TOKEN
//! viewer:
//!   full_name: Alice Tanaka
//! alerts:
//!   upcoming_window_days: 2
//!   toast_duration_ms: 5000
//! refresh:
//!   interval_secs: 60
//!   debounce_ms: 300
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VisadeskError};
use crate::logging::visadesk_home;

/// Config file path (`~/.visadesk/config.yaml`).
pub fn config_path() -> Result<PathBuf> {
    Ok(visadesk_home()?.join("config.yaml"))
}

/// Top-level visadesk configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Agency REST backend settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Who is looking at the alerts
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Alert derivation and toast settings
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Polling and debounce settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Agency REST backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing slash
    pub base_url: String,

    /// Path of the aggregated task collections endpoint
    pub tasks_path: String,

    /// Path of the client list endpoint; `{path}/{id}` looks up one client
    pub clients_path: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Name of the environment variable holding the bearer token
    pub token_env: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            tasks_path: "/api/tasks/all".to_string(),
            clients_path: "/api/clients".to_string(),
            timeout_secs: 30,
            token_env: None,
        }
    }
}

/// The signed-in staff member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Full name, compared exactly against each task's `handledBy`
    pub full_name: Option<String>,
}

/// Alert derivation and toast settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Deadlines this many days out (or fewer) raise a high-priority alert
    pub upcoming_window_days: i64,

    /// How long each toast stays on screen
    pub toast_duration_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: 2,
            toast_duration_ms: 5_000,
        }
    }
}

/// Polling and debounce settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between scheduled refreshes in watch mode
    pub interval_secs: u64,

    /// Quiet period that coalesces bursts of refresh triggers
    pub debounce_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            debounce_ms: 300,
        }
    }
}

impl Config {
    /// Load configuration from `~/.visadesk/config.yaml`.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VisadeskError::config_not_found(path, e)
            } else {
                VisadeskError::io("reading config", path, e)
            }
        })?;

        let config = Self::parse(&content).map_err(|message| VisadeskError::ConfigInvalid {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Config>(content).map_err(|e| e.to_string())
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(VisadeskError::config_validation("api.base_url must not be empty"));
        }

        if self.alerts.toast_duration_ms < 500 {
            return Err(VisadeskError::config_validation(format!(
                "alerts.toast_duration_ms must be >= 500, got {}",
                self.alerts.toast_duration_ms
            )));
        }

        if self.alerts.upcoming_window_days < 0 {
            return Err(VisadeskError::config_validation(format!(
                "alerts.upcoming_window_days must be >= 0, got {}",
                self.alerts.upcoming_window_days
            )));
        }

        if self.refresh.interval_secs < 5 {
            return Err(VisadeskError::config_validation(format!(
                "refresh.interval_secs must be >= 5, got {}",
                self.refresh.interval_secs
            )));
        }

        if self.refresh.debounce_ms > 10_000 {
            return Err(VisadeskError::config_validation(format!(
                "refresh.debounce_ms must be <= 10000, got {}",
                self.refresh.debounce_ms
            )));
        }

        // Polling re-triggers every interval; a longer quiet period never ends.
        if self.refresh.debounce_ms >= self.refresh.interval_secs.saturating_mul(1000) {
            return Err(VisadeskError::config_validation(format!(
                "refresh.debounce_ms ({}) must be shorter than refresh.interval_secs ({}s)",
                self.refresh.debounce_ms, self.refresh.interval_secs
            )));
        }

        Ok(())
    }

    /// Resolve the viewer name, preferring an explicit override.
    pub fn viewer_name(&self, cli_override: Option<&str>) -> Result<String> {
        cli_override
            .map(str::to_string)
            .or_else(|| self.viewer.full_name.clone())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| VisadeskError::ConfigMissingField {
                field: "viewer.full_name".to_string(),
            })
    }

    /// Read the bearer token from the configured environment variable, if any.
    pub fn api_token(&self) -> Option<String> {
        let var = self.api.token_env.as_deref()?;
        std::env::var(var).ok().filter(|t| !t.is_empty())
    }
}
