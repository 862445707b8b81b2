// config.rs

use crate::scheduler::{SchedulerConfig, TempoChange};
use crate::settings::Settings;
use config::{Config, ConfigError, Environment, File, FileFormat};
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables override the config file, e.g.
/// `CLICKTRACK_SCHEDULER__POLL_INTERVAL_MS=10`.
pub const ENV_PREFIX: &str = "CLICKTRACK";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub poll_interval_ms: u64,
    pub schedule_ahead_ms: u64,
    pub tempo_change: TempoChange,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        SchedulerSection {
            poll_interval_ms: 25,
            schedule_ahead_ms: 100,
            tempo_change: TempoChange::Restart,
        }
    }
}

impl SchedulerSection {
    /// Zero intervals are bumped to 1 ms so the poll cannot spin.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            schedule_ahead: Duration::from_millis(self.schedule_ahead_ms.max(1)),
            tempo_change: self.tempo_change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    /// Where settings are persisted; defaults to the user data directory
    pub settings_path: Option<PathBuf>,
    pub scheduler: SchedulerSection,
    /// Settings used when nothing has been saved yet
    pub defaults: Settings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: "debug".to_string(),
            settings_path: None,
            scheduler: SchedulerSection::default(),
            defaults: Settings::default(),
        }
    }
}

impl AppConfig {
    /// `$HOME/.config/clicktrackrs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("clicktrackrs")
                .join("config.toml")
        })
    }

    /// Layers the optional config file and the environment over defaults.
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!("Looking for config at {}", default_path.display());
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Self::from_config(config)
    }

    /// Parses TOML text directly, without file or environment lookups.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut app: AppConfig = config.try_deserialize()?;
        app.defaults = app.defaults.normalized();
        debug!("Effective configuration: {:?}", app);
        Ok(app)
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Debug)
    }
}
