use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::source::{DeviceOptions, SourceKind, SyntheticPath};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,
    /// NMEA device or recording, required for the device source.
    pub device_path: Option<PathBuf>,
    pub device_timeout_secs: u64,
    /// Oldest live fix accepted, zero to accept any age.
    pub device_max_age_ms: u64,
    pub require_fix: bool,
    pub pace_replay: bool,
    pub synthetic: SyntheticPath,
    pub sample_interval_ms: u64,
    pub stats_refresh_ms: u64,
    /// host:port used to judge connectivity
    pub network_probe: String,
    pub network_timeout_ms: u64,
    pub network_poll_secs: u64,
    pub workouts_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            device_path: None,
            device_timeout_secs: 10,
            device_max_age_ms: 1000,
            require_fix: true,
            pace_replay: true,
            synthetic: SyntheticPath::default(),
            sample_interval_ms: 1000,
            stats_refresh_ms: 1000,
            network_probe: "1.1.1.1:53".to_string(),
            network_timeout_ms: 3000,
            network_poll_secs: 5,
            workouts_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            timeout: Duration::from_secs(self.device_timeout_secs),
            require_fix: self.require_fix,
            pace_replay: self.pace_replay,
            max_age: Duration::from_millis(self.device_max_age_ms),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn stats_refresh(&self) -> Duration {
        Duration::from_millis(self.stats_refresh_ms.max(1))
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn network_poll(&self) -> Duration {
        Duration::from_secs(self.network_poll_secs.max(1))
    }

    pub fn workouts_path(&self) -> PathBuf {
        self.workouts_path
            .clone()
            .unwrap_or_else(AppDirs::workouts_path)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
