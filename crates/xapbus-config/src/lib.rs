//! Shared configuration for xapbus tools.
//!
//! TOML profiles, one per serial bus, and translation to
//! `xapbus_core::BusConfig`. The CLI layers flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use xapbus_core::{BusConfig, DeviceModel};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named bus profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use: explicit choice, then `default_profile`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            response_timeout_ms: default_response_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_response_timeout_ms() -> u64 {
    500
}
fn default_probe_timeout_ms() -> u64 {
    100
}

/// A named serial bus.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Serial device path (e.g., "/dev/ttyUSB0").
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// "XAP800" or "XAP400". Used for units that do not report a type.
    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default = "default_topic_namespace")]
    pub topic_namespace: String,

    /// Override the global response timeout.
    pub response_timeout_ms: Option<u64>,

    /// Override the global probe timeout.
    pub probe_timeout_ms: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            device_type: default_device_type(),
            topic_namespace: default_topic_namespace(),
            response_timeout_ms: None,
            probe_timeout_ms: None,
        }
    }
}

fn default_port() -> String {
    "/dev/ttyUSB0".into()
}
fn default_baud_rate() -> u32 {
    38_400
}
fn default_device_type() -> String {
    "XAP800".into()
}
fn default_topic_namespace() -> String {
    "home/HA/AudioMixers/".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "xapbus", "xapbus").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("xapbus");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file. A missing file yields defaults.
///
/// Environment keys nest with a double underscore, e.g.
/// `XAPBUS_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("XAPBUS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a validated `BusConfig` from a profile and the global defaults.
pub fn profile_to_bus_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<BusConfig, ConfigError> {
    let device_type =
        DeviceModel::from_name(&profile.device_type).map_err(|e| ConfigError::Validation {
            field: "device_type".into(),
            reason: e.to_string(),
        })?;

    let response_timeout = Duration::from_millis(
        profile
            .response_timeout_ms
            .unwrap_or(defaults.response_timeout_ms),
    );
    let probe_timeout = Duration::from_millis(
        profile
            .probe_timeout_ms
            .unwrap_or(defaults.probe_timeout_ms),
    );

    let config = BusConfig {
        serial_path: profile.port.clone(),
        baud_rate: profile.baud_rate,
        device_type,
        topic_namespace: profile.topic_namespace.clone(),
        response_timeout,
        probe_timeout,
    };
    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
default_profile = "studio"

[defaults]
output = "json"
response_timeout_ms = 400

[profiles.studio]
port = "/dev/ttyS1"
device_type = "xap400"
response_timeout_ms = 750

[profiles.lobby]
port = "/dev/ttyUSB3"
baud_rate = 9600
"#;

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&write_sample(&dir)).unwrap();

        assert_eq!(cfg.active_profile_name(None), "studio");
        assert_eq!(cfg.active_profile_name(Some("lobby")), "lobby");
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.probe_timeout_ms, 100);

        let lobby = cfg.profile("lobby").unwrap();
        assert_eq!(lobby.baud_rate, 9600);
        assert_eq!(lobby.device_type, "XAP800");
    }

    #[test]
    fn profile_overrides_default_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&write_sample(&dir)).unwrap();

        let studio = profile_to_bus_config(cfg.profile("studio").unwrap(), &cfg.defaults).unwrap();
        assert_eq!(studio.serial_path, "/dev/ttyS1");
        assert_eq!(studio.device_type, DeviceModel::Xap400);
        assert_eq!(studio.response_timeout, Duration::from_millis(750));
        assert_eq!(studio.baud_rate, 38_400);

        let lobby = profile_to_bus_config(cfg.profile("lobby").unwrap(), &cfg.defaults).unwrap();
        assert_eq!(lobby.response_timeout, Duration::from_millis(400));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile("nope"),
            Err(ConfigError::ProfileNotFound { ref name }) if name == "nope"
        ));
    }

    #[test]
    fn rejects_unknown_device_type() {
        let profile = Profile {
            device_type: "XAP1600".into(),
            ..Profile::default()
        };
        let err = profile_to_bus_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "device_type"));
    }

    #[test]
    fn rejects_probe_timeout_not_below_response_timeout() {
        let profile = Profile {
            probe_timeout_ms: Some(500),
            ..Profile::default()
        };
        assert!(profile_to_bus_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                port: "/dev/ttyACM0".into(),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.profile("default").unwrap().port, "/dev/ttyACM0");
    }
}
