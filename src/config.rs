use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    history::DEFAULT_HISTORY_CAPACITY,
    models::{
        host_address::{HostAddress, HostAddressError, DEFAULT_FEED_PORT},
        reading::SensorId,
        selection::SelectionSet,
    },
};

/// Environment variable naming the TOML settings file.
pub const CONFIG_PATH_VAR: &str = "SENSOR_DASHBOARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "sensor_dashboard.toml";

const HOST_VAR: &str = "SENSOR_DASHBOARD_HOST";
const PORT_VAR: &str = "SENSOR_DASHBOARD_PORT";
const HISTORY_VAR: &str = "SENSOR_DASHBOARD_HISTORY";
const REDRAW_VAR: &str = "SENSOR_DASHBOARD_REDRAW_MS";
const LOG_VAR: &str = "SENSOR_DASHBOARD_LOG";
const ANSI_VAR: &str = "SENSOR_DASHBOARD_ANSI";

/// Runtime settings of the dashboard.
///
/// Resolved from, in increasing priority: built in defaults, the TOML file
/// named by `SENSOR_DASHBOARD_CONFIG` (or `./sensor_dashboard.toml`), and
/// `SENSOR_DASHBOARD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardSettings {
    /// Host of the sensor feed server.
    pub host: String,
    pub port: u16,
    /// Readings kept per sensor.
    pub history_capacity: usize,
    /// Period of the chart redraw. `0` turns it off.
    pub redraw_interval_ms: u64,
    /// Sensors selected at start up.
    pub initial_selection: Vec<String>,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    /// Connect to `host` right away instead of waiting for `connect`.
    pub connect_on_start: bool,
    /// Clear the screen between frames and color series labels.
    pub ansi: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}'. Error: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}'. Error: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {name}.")]
    InvalidEnv { name: &'static str, value: String },

    #[error("History capacity must be at least one reading.")]
    ZeroHistoryCapacity,

    #[error("Invalid log level '{0}'.")]
    InvalidLogLevel(String),

    #[error("Invalid host. Error: {0}")]
    InvalidHost(#[from] HostAddressError),
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_FEED_PORT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            redraw_interval_ms: 1000,
            initial_selection: vec![],
            log_level: "info".to_owned(),
            connect_on_start: true,
            ansi: true,
        }
    }
}

impl DashboardSettings {
    /// Resolve settings from the settings file and the process environment.
    /// A missing settings file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
        let settings = Self::from_file(Path::new(&path))?.unwrap_or_default();
        let settings = settings.overlay_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file. `Ok(None)` if the file doesn't exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Self>(text)
    }

    /// Apply environment overrides. `lookup` returns the value of a variable.
    pub fn overlay_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = var(HOST_VAR) {
            self.host = host;
        }
        if let Some(value) = var(PORT_VAR) {
            self.port = parse_env(PORT_VAR, value)?;
        }
        if let Some(value) = var(HISTORY_VAR) {
            self.history_capacity = parse_env(HISTORY_VAR, value)?;
        }
        if let Some(value) = var(REDRAW_VAR) {
            self.redraw_interval_ms = parse_env(REDRAW_VAR, value)?;
        }
        if let Some(level) = var(LOG_VAR) {
            self.log_level = level;
        }
        if let Some(value) = var(ANSI_VAR) {
            self.ansi = parse_env(ANSI_VAR, value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        self.host_address()?;
        self.log_level_filter()?;
        Ok(())
    }

    pub fn host_address(&self) -> Result<HostAddress, ConfigError> {
        Ok(HostAddress::new(&self.host, self.port)?)
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// `None` when the periodic redraw is turned off.
    pub fn redraw_interval(&self) -> Option<Duration> {
        match self.redraw_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn selection(&self) -> SelectionSet {
        self.initial_selection
            .iter()
            .map(|sensor| SensorId::from(sensor.as_str()))
            .collect()
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
