//! Configuration management for the sound garden
//!
//! This crate handles loading, saving and accessing
//! application settings. Settings come from a TOML file, with
//! `SOUNDGARDEN__SECTION__KEY` environment variables layered on top.

use garden_core::{Error, Grid, KeyBindings};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "SOUNDGARDEN";

/// Grid dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub cols: u32,
    pub rows: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { cols: 8, rows: 8 }
    }
}

/// Placement defaults and voice timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Volume of newly created placements
    pub default_volume: f32,
    /// Radius of newly created placements, in cells
    pub default_radius: f32,
    /// Gain/pan ramp on cursor movement, in milliseconds
    pub ramp_ms: u64,
    /// Fade-out before a voice is stopped, in milliseconds
    pub release_ms: u64,
    /// Volume change per key press
    pub volume_step: f32,
    /// Radius change per key press
    pub radius_step: f32,
    /// Loop offset change per key press, in seconds
    pub timing_step: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            default_radius: 3.0,
            ramp_ms: 40,
            release_ms: 120,
            volume_step: 0.1,
            radius_step: 0.5,
            timing_step: 0.25,
        }
    }
}

impl PlaybackSettings {
    pub fn ramp(&self) -> Duration {
        Duration::from_millis(self.ramp_ms)
    }

    pub fn release(&self) -> Duration {
        Duration::from_millis(self.release_ms)
    }
}

/// Where recordings and persisted state live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory for persisted state and relative locators.
    /// Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Locator of the catalog listing pre-available recordings
    pub manifest: Option<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            manifest: Some("manifest.json".to_string()),
        }
    }
}

/// Audio device selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Preferred output device (empty string means system default)
    pub output_device: String,
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub audio: AudioSettings,
    pub keys: KeyBindings,
}

impl Settings {
    /// Checks values the rest of the application relies on.
    pub fn validate(&self) -> Result<(), Error> {
        Grid::new(self.grid.cols, self.grid.rows)?;
        if !(self.playback.default_radius > 0.0) {
            return Err(Error::Config(format!(
                "default_radius must be positive, got {}",
                self.playback.default_radius
            )));
        }
        if !(self.playback.default_volume >= 0.0) {
            return Err(Error::Config(format!(
                "default_volume must not be negative, got {}",
                self.playback.default_volume
            )));
        }
        let invalid = self.keys.invalid_names();
        if !invalid.is_empty() {
            return Err(Error::Config(format!(
                "unknown key names: {}",
                invalid.join(", ")
            )));
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<Grid, Error> {
        Grid::new(self.grid.cols, self.grid.rows)
    }

    /// Data directory, falling back to the platform default.
    pub fn data_dir(&self) -> Result<PathBuf, Error> {
        if let Some(dir) = &self.library.data_dir {
            return Ok(dir.clone());
        }
        let mut dir = dirs::data_dir()
            .ok_or_else(|| Error::Config("Failed to determine data directory".to_string()))?;
        dir.push("soundgarden");
        Ok(dir)
    }
}

/// Configuration manager
pub struct ConfigManager {
    settings: Settings,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Loads settings from the platform config directory
    pub fn new() -> Result<Self, Error> {
        let mut config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Failed to determine config directory".to_string()))?;
        config_dir.push("soundgarden");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        Self::with_file(config_dir.join("config.toml"))
    }

    /// Create a new ConfigManager with a custom file path
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::with_file_and_env(path, ENV_PREFIX)
    }

    fn with_file_and_env<P: AsRef<Path>>(path: P, env_prefix: &str) -> Result<Self, Error> {
        let config_file = path.as_ref().to_path_buf();
        if !config_file.exists() {
            debug!("Config file {:?} not found, using defaults", config_file);
        }
        let settings = Self::load(&config_file, env_prefix)?;
        settings.validate()?;

        Ok(Self {
            settings,
            config_file,
        })
    }

    /// Load settings from a TOML file plus environment overrides
    fn load(path: &Path, env_prefix: &str) -> Result<Settings, Error> {
        config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Save settings to the config file
    pub fn save(&self) -> Result<(), Error> {
        let toml = toml::to_string_pretty(&self.settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.config_file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        fs::write(&self.config_file, toml)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        debug!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Get the current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to settings
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.grid.cols, 8);
        assert_eq!(settings.grid.rows, 8);
        assert_eq!(settings.playback.default_radius, 3.0);
        assert_eq!(settings.playback.default_volume, 1.0);
        assert_eq!(settings.playback.ramp(), Duration::from_millis(40));
        assert_eq!(settings.library.manifest.as_deref(), Some("manifest.json"));
        assert!(settings.validate().is_ok());
    }

    #[test_log::test]
    fn save_and_load() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = ConfigManager::with_file(&config_path).unwrap();
        config.settings_mut().grid.cols = 12;
        config.settings_mut().playback.default_radius = 4.5;
        config.settings_mut().keys.up = vec!["k".to_string()];
        config.settings_mut().library.data_dir = Some(temp_dir.path().to_path_buf());

        config.save().unwrap();
        assert!(config_path.exists());

        let loaded = ConfigManager::with_file(&config_path).unwrap();
        assert_eq!(loaded.settings(), config.settings());
    }

    #[test]
    fn file_not_found_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let nonexistent_path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigManager::with_file(&nonexistent_path).unwrap();
        assert_eq!(config.settings(), &Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("partial.toml");
        fs::write(&path, "[grid]\ncols = 5\n\n[keys]\ncancel = [\"q\"]\n").unwrap();

        let config = ConfigManager::with_file(&path).unwrap();
        assert_eq!(config.settings().grid.cols, 5);
        assert_eq!(config.settings().grid.rows, 8);
        assert_eq!(config.settings().keys.cancel, vec!["q".to_string()]);
        assert_eq!(config.settings().keys.up, KeyBindings::default().up);
    }

    #[test]
    fn environment_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("env.toml");
        fs::write(&path, "[grid]\ncols = 5\n").unwrap();

        std::env::set_var("SOUNDGARDEN_ENV_TEST__GRID__COLS", "11");
        let config = ConfigManager::with_file_and_env(&path, "SOUNDGARDEN_ENV_TEST").unwrap();
        std::env::remove_var("SOUNDGARDEN_ENV_TEST__GRID__COLS");

        assert_eq!(config.settings().grid.cols, 11);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp_dir = tempdir().unwrap();

        let path = temp_dir.path().join("zero.toml");
        fs::write(&path, "[grid]\ncols = 0\n").unwrap();
        assert!(matches!(
            ConfigManager::with_file(&path),
            Err(Error::Config(_))
        ));

        let path = temp_dir.path().join("radius.toml");
        fs::write(&path, "[playback]\ndefault_radius = -1.0\n").unwrap();
        assert!(ConfigManager::with_file(&path).is_err());

        let path = temp_dir.path().join("keys.toml");
        fs::write(&path, "[keys]\nup = [\"Hyper\"]\n").unwrap();
        assert!(ConfigManager::with_file(&path).is_err());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let mut settings = Settings::default();
        settings.library.data_dir = Some(PathBuf::from("/tmp/garden"));
        assert_eq!(settings.data_dir().unwrap(), PathBuf::from("/tmp/garden"));
    }
}
