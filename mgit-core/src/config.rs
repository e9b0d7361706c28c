//! Key/value configuration
//!
//! Keys are `section.name` strings. Lookups consult, in order: environment
//! overrides, the repository config, then the user-global config. Writes only
//! ever touch the repository config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::object::Signature;

pub const USER_NAME: &str = "user.name";
pub const USER_EMAIL: &str = "user.email";
pub const CORE_BARE: &str = "core.bare";
pub const DEFAULT_BRANCH: &str = "init.defaultBranch";

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_EMAIL: &str = "unknown@localhost";
const DEFAULT_BRANCH_NAME: &str = "main";

/// Name of the user-global config file under `$HOME`
pub const GLOBAL_CONFIG_FILE: &str = ".mgitconfig";

/// Environment variables that override config keys
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("MGIT_AUTHOR_NAME", USER_NAME),
    ("MGIT_AUTHOR_EMAIL", USER_EMAIL),
];

/// One config file: a flat JSON object of key → value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFile {
    pub values: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Load from disk; a missing file is empty
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io(path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json + "\n").at_path(&tmp)?;
        fs::rename(&tmp, path).at_path(path)
    }
}

/// Layered configuration for one repository
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    local: ConfigFile,
    global: ConfigFile,
    env: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Load the repository config at `path` plus the user-global config and
    /// environment overrides of the current process
    pub fn load(path: &Path) -> Result<Self> {
        let global = match global_config_path() {
            Some(p) => ConfigFile::load(&p)?,
            None => ConfigFile::default(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            local: ConfigFile::load(path)?,
            global,
            env: env_overrides(|var| std::env::var(var).ok()),
        })
    }

    /// Build from explicit layers
    pub fn with_layers(path: &Path, global: ConfigFile, env: BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            local: ConfigFile::load(path)?,
            global,
            env,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Effective value of a key
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self
            .env
            .get(key)
            .or_else(|| self.local.values.get(key))
            .or_else(|| self.global.values.get(key))
            .cloned())
    }

    /// Set a key in the repository config and persist it
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.local.values.insert(key.to_string(), value.to_string());
        self.local.save(&self.path)?;
        tracing::debug!(key, "set config value");
        Ok(())
    }

    /// Remove a key from the repository config
    pub fn unset(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        if self.local.values.remove(key).is_none() {
            return Err(Error::ConfigKeyNotFound(key.to_string()));
        }
        self.local.save(&self.path)
    }

    /// All effective keys and values, sorted by key
    pub fn list(&self) -> Vec<(String, String)> {
        let mut merged = self.global.values.clone();
        merged.extend(self.local.values.clone());
        merged.extend(self.env.clone());
        merged.into_iter().collect()
    }

    /// Replace the repository config with the given values
    pub fn reset(&mut self, values: BTreeMap<String, String>) -> Result<()> {
        self.local = ConfigFile { values };
        self.local.save(&self.path)
    }

    /// Commit identity at the current time
    pub fn identity(&self) -> Result<Signature> {
        let name = self.get(USER_NAME)?.unwrap_or_else(|| DEFAULT_NAME.to_string());
        let email = self.get(USER_EMAIL)?.unwrap_or_else(|| DEFAULT_EMAIL.to_string());
        Ok(Signature::now(&name, &email))
    }
}

/// Branch created by `init`, from the user-global config
pub fn default_branch() -> Result<String> {
    let global = match global_config_path() {
        Some(p) => ConfigFile::load(&p)?,
        None => ConfigFile::default(),
    };
    Ok(global
        .values
        .get(DEFAULT_BRANCH)
        .cloned()
        .unwrap_or_else(|| DEFAULT_BRANCH_NAME.to_string()))
}

/// `$HOME/.mgitconfig`, if `HOME` is set
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(GLOBAL_CONFIG_FILE))
}

fn env_overrides(lookup: impl Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
    ENV_OVERRIDES
        .iter()
        .filter_map(|(var, key)| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v))
        })
        .collect()
}

/// Keys are `section.name` with non-empty dot-separated parts made of
/// ASCII letters, digits, `-` and `_`
pub fn validate_key(key: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let valid = parts.len() >= 2
        && parts.iter().all(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
    if !valid {
        return Err(Error::InvalidConfigKey(key.to_string()));
    }
    Ok(())
}
