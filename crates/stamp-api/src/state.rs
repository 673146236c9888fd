//! # Application State
//!
//! Shared state for the Axum application: the [`StampService`] holding the
//! injected collaborators, and the server's own configuration. Cloned into
//! every handler; the service is cheap to clone (`Arc` handles inside).

use stamp_anchor::StampService;
use stamp_client::ConfigError;

use crate::middleware::metrics::StampMetrics;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload body limit (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Maximum accepted upload size in bytes.
    pub upload_max_bytes: usize,
    /// Run a log reconciliation pass during bootstrap.
    pub sync_on_startup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            sync_on_startup: false,
        }
    }
}

impl AppConfig {
    /// Load from `PORT`, `FILE_UPLOAD_MAX_SIZE` and `SYNC_ON_STARTUP`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            upload_max_bytes: parse_var("FILE_UPLOAD_MAX_SIZE", defaults.upload_max_bytes)?,
            sync_on_startup: std::env::var("SYNC_ON_STARTUP")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.sync_on_startup),
        })
    }
}

fn parse_var<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidNumber(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Stamp workflows over the injected collaborators.
    pub service: StampService,
    /// Server configuration.
    pub config: AppConfig,
    /// Request and workflow counters.
    pub metrics: StampMetrics,
}

impl AppState {
    /// Build state from a service and configuration, with zeroed counters.
    pub fn new(service: StampService, config: AppConfig) -> Self {
        Self {
            service,
            config,
            metrics: StampMetrics::new(),
        }
    }
}
