use std::fs;
use std::path::Path;
use std::time::Duration;

use scout_engine::{EngineConfig, PullSettings};
use scout_logging::{scout_info, scout_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "scout.ron";

/// On-disk shape of the engine configuration. Durations are milliseconds and
/// every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub poll_interval_ms: u64,
    pub silence_grace_ms: u64,
    pub silence_check_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_response_bytes: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for FileConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            ws_base_url: config.ws_base_url.clone(),
            poll_interval_ms: millis(config.poll_interval),
            silence_grace_ms: millis(config.silence_grace),
            silence_check_interval_ms: millis(config.silence_check_interval),
            connect_timeout_ms: millis(config.pull.connect_timeout),
            request_timeout_ms: millis(config.pull.request_timeout),
            max_response_bytes: config.pull.max_bytes,
        }
    }
}

impl FileConfig {
    pub fn into_engine_config(self) -> EngineConfig {
        EngineConfig {
            api_base_url: self.api_base_url,
            ws_base_url: self.ws_base_url,
            // A zero period would spin; clamp to 1 ms.
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            silence_grace: Duration::from_millis(self.silence_grace_ms),
            silence_check_interval: Duration::from_millis(self.silence_check_interval_ms.max(1)),
            pull: PullSettings {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                max_bytes: self.max_response_bytes,
            },
        }
    }
}

/// Read the config file at `path`. A missing file means defaults; a broken
/// one is reported and also falls back to defaults.
pub fn load_config(path: &Path) -> FileConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return FileConfig::default();
        }
        Err(err) => {
            scout_warn!("Failed to read config from {:?}: {}", path, err);
            return FileConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            scout_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            scout_warn!("Failed to parse config from {:?}: {}", path, err);
            FileConfig::default()
        }
    }
}

/// Pretty RON text of `config`, suitable as a starting `scout.ron`.
pub fn render_config(config: &FileConfig) -> Result<String, ron::Error> {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::new())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
