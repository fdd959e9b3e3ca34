use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the persisted selection keys.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// Where the branch list comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Optional TOML catalog.  When the file does not exist the built-in
    /// branches are used.
    #[serde(default = "default_locations_toml")]
    pub locations_toml: PathBuf,
    /// Selection used when nothing valid has been persisted yet.
    #[serde(default = "default_location")]
    pub default_location: String,
}

/// Which geolocation capability the session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoProvider {
    /// Reports the configured latitude/longitude.
    Fixed,
    /// Capability present, every request is refused.
    Denied,
    /// No capability at all.
    #[default]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Run detection automatically at startup (unless dismissed earlier).
    #[serde(default = "default_detection_enabled")]
    pub enabled: bool,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default)]
    pub provider: GeoProvider,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Simulated time until a fixed provider answers.
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// How long an ephemeral message stays up.
    #[serde(default = "default_ephemeral_ms")]
    pub ephemeral_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Frame interval for coalesced scroll recomputation.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            locations_toml: default_locations_toml(),
            default_location: default_location(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_detection_enabled(),
            startup_delay_ms: default_startup_delay_ms(),
            provider: GeoProvider::default(),
            latitude: 0.0,
            longitude: 0.0,
            latency_ms: 0,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            ephemeral_ms: default_ephemeral_ms(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
        }
    }
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("storage.json")
}

fn default_locations_toml() -> PathBuf {
    platform::config_dir().join("locations.toml")
}

fn default_location() -> String {
    "geldrop".to_string()
}

fn default_detection_enabled() -> bool {
    true
}

fn default_startup_delay_ms() -> u64 {
    3000
}

fn default_ephemeral_ms() -> u64 {
    3000
}

fn default_frame_ms() -> u64 {
    16
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
