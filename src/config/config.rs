//! Merged configuration tree and its typed section snapshots.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Profile;
use crate::error::ConfigError;

/// Typed snapshot of the `master` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Robot name.
    pub name: String,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            name: "botvisor".to_string(),
        }
    }
}

/// Typed snapshot of the robot's api surface (`master.api`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSurfaceConfig {
    /// Whether the robot exposes a request surface at all.
    pub enable: bool,
    /// Verbose request logging on the surface.
    pub debug: bool,
    /// Mount path prefix.
    pub path: String,
}

impl Default for ApiSurfaceConfig {
    fn default() -> Self {
        Self {
            enable: true,
            debug: false,
            path: "/api".to_string(),
        }
    }
}

/// Typed snapshot of the `api` section (the api server itself).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Whether the api server starts at all.
    pub enable: bool,
    /// Listen address.
    pub addr: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            addr: "127.0.0.1".to_string(),
            port: 6490,
        }
    }
}

/// Typed snapshot of the `console` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Whether the console accepts sessions.
    pub enable: bool,
    /// Listen address.
    pub addr: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enable: true,
            addr: "127.0.0.1".to_string(),
            port: 6492,
        }
    }
}

/// Merged configuration tree with named sections.
///
/// Backed by a JSON object whose top-level keys are the sections
/// (`master`, `auth`, `api`, `console`). Built by merging defaults, then
/// each existing profile file, then flag overrides; readers treat it as
/// immutable after `configure` succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    root: Map<String, Value>,
}

impl Config {
    /// Creates an empty configuration (no sections).
    pub fn new() -> Self {
        Self { root: Map::new() }
    }

    /// Returns the built-in defaults for all four sections.
    pub fn defaults() -> Self {
        let mut cfg = Self::new();
        cfg.put_section("master", &MasterConfig::default());
        cfg.set(
            "master",
            "api",
            serde_json::to_value(ApiSurfaceConfig::default()).unwrap_or(Value::Null),
        );
        cfg.set("auth", "dir", Value::String("auth".to_string()));
        cfg.put_section("api", &ServerConfig::default());
        cfg.put_section("console", &ConsoleConfig::default());
        cfg
    }

    fn put_section<T: Serialize>(&mut self, name: &str, value: &T) {
        if let Ok(Value::Object(map)) = serde_json::to_value(value) {
            self.root.insert(name.to_string(), Value::Object(map));
        }
    }

    /// Seeds this tree with `defaults`: existing keys win over defaults.
    pub fn set_defaults(&mut self, defaults: Config) {
        let mut base = defaults.root;
        let current = std::mem::take(&mut self.root);
        merge_objects(&mut base, current);
        self.root = base;
    }

    /// Loads every existing configuration file of `profile`, merging each
    /// over the previous one. Missing files are skipped at debug level.
    pub fn load(&mut self, profile: &Profile) -> Result<(), ConfigError> {
        for path in profile.config_files() {
            self.read_file(&path)?;
        }
        Ok(())
    }

    fn read_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let blob = match fs::read_to_string(path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("config skip {}: {err}", path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let value: Value = serde_json::from_str(&blob).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(incoming) => {
                merge_objects(&mut self.root, incoming);
                log::debug!("config loaded {}", path.display());
                Ok(())
            }
            other => Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: serde::de::Error::custom(format!(
                    "expected a JSON object, got {other}"
                )),
            }),
        }
    }

    /// Returns a named section, if present.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.root.get(name).and_then(Value::as_object)
    }

    /// Returns a string value from a section.
    pub fn get_str(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }

    /// Returns a bool value from a section.
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.section(section)?.get(key)?.as_bool()
    }

    /// Returns an unsigned value from a section.
    pub fn get_uint(&self, section: &str, key: &str) -> Option<u64> {
        self.section(section)?.get(key)?.as_u64()
    }

    /// Sets one key in a section, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// Typed snapshot of the `master` section.
    pub fn master(&self) -> Result<MasterConfig, ConfigError> {
        self.typed("master")
    }

    /// Typed snapshot of the robot's api surface (`master.api`).
    pub fn api_surface(&self) -> Result<ApiSurfaceConfig, ConfigError> {
        let value = self
            .section("master")
            .and_then(|m| m.get("api"))
            .cloned()
            .unwrap_or(Value::Null);
        if value.is_null() {
            return Ok(ApiSurfaceConfig::default());
        }
        serde_json::from_value(value).map_err(|source| ConfigError::Section {
            section: "master.api",
            source,
        })
    }

    /// Typed snapshot of the `api` section.
    pub fn server(&self) -> Result<ServerConfig, ConfigError> {
        self.typed("api")
    }

    /// Typed snapshot of the `console` section.
    pub fn console(&self) -> Result<ConsoleConfig, ConfigError> {
        self.typed("console")
    }

    fn typed<T>(&self, section: &'static str) -> Result<T, ConfigError>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        match self.root.get(section) {
            None => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|source| ConfigError::Section { section, source }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merges `incoming` over `base`: objects merge recursively, any other
/// value replaces the previous one.
fn merge_objects(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(dst)), Value::Object(src)) => merge_objects(dst, src),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
