// src/config.rs
use crate::workout::Coordinates;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "maptrack";
const CONFIG_ENV_VAR: &str = "MAPTRACK_CONFIG_DIR";

/// Leaflet-style zoom levels; 0 is the whole world, ~19 is rooftops.
pub const MAX_ZOOM_LEVEL: u8 = 19;

const DEFAULT_ZOOM_LEVEL: u8 = 13;
const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid zoom level {0}: must be between 1 and {MAX_ZOOM_LEVEL}.")]
    InvalidZoomLevel(u8),
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("Home position not set. Use 'set-home <lat> <lng>' or update {0:?}.")]
    HomeNotSet(PathBuf),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Zoom used when the map initializes and when panning to an entry.
    pub map_zoom_level: u8,
    /// Tile layer the map widget should load.
    pub tile_url: String,
    /// Position the geolocator falls back to when the platform has no real
    /// provider (the CLI always resolves against this).
    pub home_lat: Option<f64>,
    pub home_lng: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            map_zoom_level: DEFAULT_ZOOM_LEVEL,
            tile_url: DEFAULT_TILE_URL.to_string(),
            home_lat: None,
            home_lng: None,
        }
    }
}

impl Config {
    pub fn home_position(&self) -> Option<Coordinates> {
        match (self.home_lat, self.home_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}

/// Determines the path to the configuration file, honoring the
/// `MAPTRACK_CONFIG_DIR` override. Creates the directory if needed.
///
/// # Errors
/// `ConfigError::CannotDetermineConfigDir` or `ConfigError::Io`.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                fs::create_dir_all(&path)?;
            }
            path
        }
        None => {
            let base = dirs::config_dir().ok_or(ConfigError::CannotDetermineConfigDir)?;
            base.join(APP_CONFIG_DIR)
        }
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, writing a default file on first run.
///
/// # Errors
/// `ConfigError` variants on I/O or TOML failures.
pub fn load(config_path: &Path) -> Result<Config, ConfigError> {
    if config_path.exists() {
        let raw = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&raw).map_err(ConfigError::TomlParse)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration as pretty TOML.
///
/// # Errors
/// `ConfigError` variants on I/O or TOML failures.
pub fn save(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let raw = toml::to_string_pretty(config).map_err(ConfigError::TomlSerialize)?;
    fs::write(config_path, raw)?;
    Ok(())
}
