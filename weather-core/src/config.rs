use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    location::{DEFAULT_IP_ENDPOINT, FixedLocation, IpLocationService, LocationService},
    model::{Coordinates, DEFAULT_ICON_BASE_URL},
    provider::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable that overrides the provider endpoint.
pub const BASE_URL_ENV: &str = "WEATHER_BASE_URL";

/// How "use my location" obtains a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    /// Approximate position from an IP geolocation service.
    #[default]
    Ip,
    /// Coordinates stored in the config file.
    Fixed,
    /// No location capability at all.
    Disabled,
}

impl LocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationMode::Ip => "ip",
            LocationMode::Fixed => "fixed",
            LocationMode::Disabled => "disabled",
        }
    }

    pub const fn all() -> &'static [LocationMode] {
        &[LocationMode::Ip, LocationMode::Fixed, LocationMode::Disabled]
    }
}

impl std::fmt::Display for LocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Example TOML:
/// [location]
/// mode = "fixed"
/// latitude = 51.5
/// longitude = -0.12
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub mode: LocationMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip_endpoint: Option<String>,
}

impl LocationConfig {
    pub fn fixed_coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeather API key. Not validated here; a bad key surfaces as the
    /// provider's own error message.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub icon_base_url: Option<String>,
    /// Optional HTTP timeout. Without it a hung request stays loading.
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub location: LocationConfig,
}

impl Config {
    /// Load config from the platform config directory, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn icon_base_url(&self) -> &str {
        self.icon_base_url.as_deref().unwrap_or(DEFAULT_ICON_BASE_URL)
    }

    /// The location service described by `[location]`, or `None` when the
    /// capability is disabled or the fixed coordinates are incomplete.
    pub fn location_service(&self) -> Option<Box<dyn LocationService>> {
        match self.location.mode {
            LocationMode::Disabled => None,
            LocationMode::Fixed => match self.location.fixed_coordinates() {
                Some(coords) => Some(Box::new(FixedLocation::new(coords))),
                None => {
                    tracing::warn!("location mode is \"fixed\" but latitude/longitude are missing");
                    None
                }
            },
            LocationMode::Ip => {
                let endpoint =
                    self.location.ip_endpoint.as_deref().unwrap_or(DEFAULT_IP_ENDPOINT);
                Some(Box::new(IpLocationService::with_endpoint(endpoint)))
            }
        }
    }

    /// Convenience helper: set/replace the API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_openweather() {
        let cfg = Config::default();

        assert_eq!(cfg.base_url(), "https://api.openweathermap.org/data/2.5/weather");
        assert_eq!(cfg.icon_base_url(), "https://openweathermap.org/img/wn");
        assert!(!cfg.has_api_key());
        assert_eq!(cfg.location.mode, LocationMode::Ip);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("nope.toml")).expect("load");

        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.timeout_secs = Some(5);
        cfg.location = LocationConfig {
            mode: LocationMode::Fixed,
            latitude: Some(48.85),
            longitude: Some(2.35),
            ip_endpoint: None,
        };

        cfg.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");

        assert_eq!(loaded, cfg);
        assert_eq!(loaded.location.fixed_coordinates(), Some(Coordinates::new(48.85, 2.35)));
    }

    #[test]
    fn parses_hand_written_toml() {
        let cfg: Config = toml::from_str(
            r#"
            api_key = "abc"
            timeout_secs = 10

            [location]
            mode = "disabled"
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.timeout_secs, Some(10));
        assert_eq!(cfg.location.mode, LocationMode::Disabled);
        assert!(cfg.location_service().is_none());
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = [").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([(API_KEY_ENV, "ENV_KEY"), (BASE_URL_ENV, "http://localhost:1/w")]);

        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.api_key.as_deref(), Some("ENV_KEY"));
        assert_eq!(cfg.base_url(), "http://localhost:1/w");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());
        cfg.apply_env(|_| Some("  ".to_string()));

        assert_eq!(cfg.api_key.as_deref(), Some("FILE_KEY"));
        assert!(cfg.base_url.is_none());
    }

    #[test]
    fn fixed_mode_without_coordinates_has_no_service() {
        let mut cfg = Config::default();
        cfg.location.mode = LocationMode::Fixed;
        cfg.location.latitude = Some(1.0);

        assert!(cfg.location_service().is_none());
    }

    #[test]
    fn ip_and_complete_fixed_modes_have_a_service() {
        let mut cfg = Config::default();
        assert!(cfg.location_service().is_some());

        cfg.location = LocationConfig {
            mode: LocationMode::Fixed,
            latitude: Some(1.0),
            longitude: Some(2.0),
            ip_endpoint: None,
        };
        assert!(cfg.location_service().is_some());
    }
}
