//! YAML configuration parsing.
//!
//! Parses the service configuration (`cadence.yaml`): server binding,
//! storage backend, validation rules and optional seed data.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use super::error::ConfigError;
use crate::core::schedule::{App, Schedule};
use crate::core::types::AppId;

const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
const DEFAULT_MIN_CRON_INTERVAL_SECS: u64 = 60;
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 2000;

/// Service configuration (cadence.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// HTTP server binding.
    pub server: ServerConfig,
    /// Storage backend.
    pub storage: StorageConfig,
    /// Upper bound for a single repository call.
    pub storage_timeout_ms: u64,
    /// Business validation rules.
    pub rules: ValidationRules,
    /// Applications registered at startup.
    pub apps: Vec<App>,
    /// Schedules inserted at startup.
    pub schedules: Vec<Schedule>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            rules: ValidationRules::default(),
            apps: Vec::new(),
            schedules: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8570,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// In-memory storage (default, non-persistent).
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// SQLite storage.
    #[serde(rename = "sqlite")]
    Sqlite {
        /// Path to the database file.
        path: String,
    },
}

/// Rules applied to a merged schedule before it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationRules {
    /// Largest accepted payload, in bytes.
    pub max_payload_bytes: usize,
    /// Smallest accepted gap between two firings.
    pub min_cron_interval_secs: u64,
    /// Timezone cron expressions are evaluated in.
    pub timezone: String,
    /// Per-app overrides keyed by app id.
    pub apps: HashMap<String, RuleOverrides>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            min_cron_interval_secs: DEFAULT_MIN_CRON_INTERVAL_SECS,
            timezone: "UTC".to_string(),
            apps: HashMap::new(),
        }
    }
}

/// Per-app override of the global rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleOverrides {
    pub max_payload_bytes: Option<usize>,
    pub min_cron_interval_secs: Option<u64>,
}

/// The rules that apply to one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRules<'a> {
    pub max_payload_bytes: usize,
    pub min_cron_interval: Duration,
    pub timezone: &'a str,
}

impl ValidationRules {
    /// Resolve the global rules against the overrides for `app_id`.
    pub fn for_app(&self, app_id: &AppId) -> AppRules<'_> {
        let overrides = self.apps.get(app_id.as_str());
        AppRules {
            max_payload_bytes: overrides
                .and_then(|o| o.max_payload_bytes)
                .unwrap_or(self.max_payload_bytes),
            min_cron_interval: Duration::from_secs(
                overrides
                    .and_then(|o| o.min_cron_interval_secs)
                    .unwrap_or(self.min_cron_interval_secs),
            ),
            timezone: &self.timezone,
        }
    }
}

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load service configuration from a file.
    pub fn load_service_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;
        let config: ServiceConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate_service_config(&config)?;
        Ok(config)
    }

    /// Parse service configuration from a YAML string.
    pub fn parse_service_config(yaml: &str) -> Result<ServiceConfig, ConfigError> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)?;
        Self::validate_service_config(&config)?;
        Ok(config)
    }

    /// Validate a service configuration.
    fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::MissingField("server.host".into()));
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidConfig("server.port cannot be zero".into()));
        }

        if config.storage_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "storageTimeoutMs cannot be zero".into(),
            ));
        }

        if let StorageConfig::Sqlite { path } = &config.storage {
            if path.trim().is_empty() {
                return Err(ConfigError::MissingField("storage.path".into()));
            }
        }

        config.rules.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::InvalidConfig(format!("unknown timezone: {}", config.rules.timezone))
        })?;

        // Check for duplicate app IDs
        let mut app_ids: HashSet<&str> = HashSet::new();
        for app in &config.apps {
            if app.app_id.is_empty() {
                return Err(ConfigError::MissingField("apps[].appId".into()));
            }
            if !app_ids.insert(app.app_id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "duplicate app id: {}",
                    app.app_id
                )));
            }
        }

        // Seeded schedules must belong to a seeded app
        let mut schedule_ids = HashSet::new();
        for schedule in &config.schedules {
            if !app_ids.contains(schedule.app_id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "schedule {} references unknown app: {}",
                    schedule.schedule_id, schedule.app_id
                )));
            }
            if !schedule_ids.insert(schedule.schedule_id) {
                return Err(ConfigError::InvalidConfig(format!(
                    "duplicate schedule id: {}",
                    schedule.schedule_id
                )));
            }
        }

        Ok(())
    }
}
