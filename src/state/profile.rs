//! Connection profiles and their JSON persistence.
//!
//! Profiles are stored as a name-keyed map in `profiles.json` under the
//! per-user config directory. A missing or unparseable file is treated as an
//! empty store. Passwords are persisted in cleartext for compatibility with
//! the existing store format; the file itself is kept at mode 0600.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::utils;

/// A saved VPN connection profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Display name; unique key in the store.
    pub name: String,
    /// Path to the `.ovpn` configuration file.
    pub config_path: PathBuf,
    /// Optional username for `--auth-user-pass`.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password, stored in cleartext (see module docs).
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionProfile {
    /// Whether this profile carries a usable credential pair.
    pub fn has_credentials(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

/// Persistent name → profile mapping.
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl ProfileStore {
    /// Open the store at the default location under the config directory.
    pub fn open_default() -> std::io::Result<Self> {
        let path = utils::config_dir()?.join(constants::PROFILES_FILE_NAME);
        Ok(Self::open(path))
    }

    /// Open a store backed by `path`, loading whatever is readable there.
    pub fn open(path: PathBuf) -> Self {
        let profiles = Self::load_from(&path);
        Self { path, profiles }
    }

    fn load_from(path: &Path) -> BTreeMap<String, ConnectionProfile> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Persist the store, restricting the file to owner read/write.
    pub fn save(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.profiles)?;
        fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Insert or replace a profile and persist.
    pub fn add(&mut self, profile: ConnectionProfile) -> std::io::Result<()> {
        self.profiles.insert(profile.name.clone(), profile);
        self.save()
    }

    /// Remove a profile by name and persist. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> std::io::Result<bool> {
        let existed = self.profiles.remove(name).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.get(name)
    }

    /// All profiles in name order.
    pub fn all(&self) -> Vec<ConnectionProfile> {
        self.profiles.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}
