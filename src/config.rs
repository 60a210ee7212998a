//! Application settings loaded from `settings.toml`.
//!
//! Every field has a default so a missing or malformed file degrades to the
//! built-in configuration instead of failing startup.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::constants;
use crate::utils;

/// Tunable settings for the supervisor and UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name (or path) of the VPN client binary.
    pub client_binary: String,
    /// Script passed as `--up`.
    pub up_script: PathBuf,
    /// Script passed as `--down`.
    pub down_script: PathBuf,
    /// UI tick rate in milliseconds.
    pub tick_rate_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_binary: constants::DEFAULT_CLIENT_BINARY.to_string(),
            up_script: PathBuf::from(constants::DEFAULT_HOOK_SCRIPT),
            down_script: PathBuf::from(constants::DEFAULT_HOOK_SCRIPT),
            tick_rate_ms: constants::DEFAULT_TICK_RATE,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, falling back to defaults
    /// when the file is absent or unparseable.
    pub fn load() -> Self {
        let Ok(dir) = utils::config_dir() else {
            return Self::default();
        };
        let path = dir.join(constants::SETTINGS_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.client_binary, "openvpn");
        assert_eq!(settings.tick_rate_ms, 1000);
        assert_eq!(
            settings.up_script,
            PathBuf::from("/etc/openvpn/update-resolv-conf")
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("client_binary = \"openvpn3\"").unwrap();
        assert_eq!(settings.client_binary, "openvpn3");
        assert_eq!(settings.tick_rate_ms, 1000);
    }

    #[test]
    fn test_malformed_toml_degrades_to_defaults() {
        let parsed: Result<Settings, _> = toml::from_str("client_binary = [not toml");
        let settings = parsed.unwrap_or_default();
        assert_eq!(settings.client_binary, "openvpn");
    }
}
