//! Worker configuration.
//!
//! The service worker has no ambient mutable state: the cache generation
//! name, asset manifest, and notification defaults are all carried in a
//! [`WorkerConfig`] handed into each operation. The defaults pin the
//! constants of the deployed SnackStopper client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors that can occur loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Configuration for the service worker runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Origin the worker controls; manifest entries and API paths are
    /// resolved against it.
    pub base_url: Url,

    /// Name of the current cache generation.
    pub cache_name: String,

    /// URLs pre-populated into the cache at install time. Fixed for a
    /// deployed version, never mutated at runtime.
    pub asset_manifest: Vec<String>,

    /// Path prefix selecting the network-first strategy.
    pub api_prefix: String,

    /// Page opened or focused after a notification interaction.
    pub app_path: String,

    /// Endpoint receiving action-routed check-ins.
    pub checkin_path: String,

    /// Whether a successful install skips the waiting hold and proceeds
    /// straight to activation.
    pub skip_waiting: bool,

    /// Notification defaults.
    pub notification: NotificationConfig,
}

/// Appearance and wording of the reminder notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title used when the push payload carries none.
    pub default_title: String,

    /// Body used when no payload is attached at all.
    pub default_body: String,

    /// Icon image path.
    pub icon: String,

    /// Badge image path.
    pub badge: String,

    /// Vibration pattern in milliseconds.
    pub vibration: Vec<u32>,

    /// Deduplication tag: a second push replaces the prior notification
    /// instead of stacking.
    pub tag: String,

    /// Label of the "passed" action button.
    pub passed_label: String,

    /// Label of the "stopped" action button.
    pub stopped_label: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:5000/").expect("static base URL"),
            cache_name: "snackstopper-v1".to_string(),
            asset_manifest: vec![
                "/".to_string(),
                "/static/style.css".to_string(),
                "/static/app.js".to_string(),
                "/static/manifest.json".to_string(),
            ],
            api_prefix: "/api/".to_string(),
            app_path: "/".to_string(),
            checkin_path: "/api/checkin".to_string(),
            skip_waiting: true,
            notification: NotificationConfig::default(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_title: "SnackStopper".to_string(),
            default_body: "Rij door!".to_string(),
            icon: "/static/icon-192.png".to_string(),
            badge: "/static/icon-192.png".to_string(),
            vibration: vec![200, 100, 200],
            tag: "snackstopper-reminder".to_string(),
            passed_label: "Doorgereden \u{2713}".to_string(),
            stopped_label: "Gestopt \u{2717}".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve a site-relative path (or absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        Ok(self.base_url.join(path)?)
    }
}
