// Configuration management for arbor sites
//
// Sources are layered in load order, later ones overriding earlier ones
// key by key: typically a JSON or TOML file, then a `.env` file, then the
// process environment.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{LogSettings, MAX_REDIRECTS_LIMIT, ScopeName, SiteSettings};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Prefix of the environment variables read by [`ConfigManager::new`].
pub const ENV_PREFIX: &str = "ARBOR";

/// Layered configuration store.
///
/// Keys are dotted paths into the merged tree (`log.level`).
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Manager reading `ARBOR_*` variables.
    pub fn new() -> Self {
        Self::with_prefix(ENV_PREFIX.to_string())
    }

    pub fn with_prefix(prefix: String) -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix),
        }
    }

    fn env_loader(&self) -> EnvLoader {
        EnvLoader::new(self.env_prefix.clone())
    }

    /// Layer the process environment on top.
    pub fn load_env(&self) -> Result<()> {
        let vars = self.env_loader().load()?;
        self.layer(vars);
        Ok(())
    }

    /// Layer a `.env` file on top without touching the process
    /// environment. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => self.load_file_as(path, FileFormat::Env),
            None if Path::new(".env").exists() => self.load_file_as(".env", FileFormat::Env),
            None => Ok(()),
        }
    }

    /// Layer a file on top, detecting its format from the name.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let format = FileFormat::detect(path.as_ref())?;
        self.load_file_as(path, format)
    }

    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.layer_parsed(data, format);
        Ok(())
    }

    /// Layer configuration text on top.
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.layer_parsed(data, format);
        Ok(())
    }

    fn layer_parsed(&self, data: Value, format: FileFormat) {
        let Value::Object(map) = data else {
            return;
        };
        let map = match format {
            FileFormat::Env => self.env_loader().collect(
                map.into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k, v.to_string()))),
            ),
            FileFormat::Json | FileFormat::Toml => map,
        };
        self.layer(map);
    }

    fn layer(&self, source: Map<String, Value>) {
        let mut config = self.config.write();
        for (key, value) in source {
            match config.get_mut(&key) {
                Some(existing) => merge(existing, value),
                None => {
                    config.insert(key, value);
                }
            }
        }
    }

    /// Set a value at a dotted path.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::Shape(e.to_string()))?;
        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        env::insert_path(&mut self.config.write(), &path, value);
        Ok(())
    }

    /// Get a value at a dotted path.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| ConfigError::Shape(e.to_string()))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        let mut parts = key.split('.');
        let mut current = config.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current.clone())
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Layer everything in `other` on top of this manager.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let snapshot = other.config.read().clone();
        self.layer(snapshot);
    }

    /// Deserialize the whole tree and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let tree = Value::Object(self.config.read().clone());
        let validated: T = serde_json::from_value(tree)
            .map_err(|e| ConfigError::Shape(e.to_string()))?;
        validated.validate()?;
        Ok(validated)
    }

    pub fn site_settings(&self) -> Result<SiteSettings> {
        self.load_validated()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings from an optional file, then a `.env` file, then `ARBOR_*`
/// variables.
pub fn load_site_settings(path: Option<&Path>) -> Result<SiteSettings> {
    let manager = ConfigManager::new();
    if let Some(path) = path {
        manager.load_file(path)?;
    }
    manager.load_dotenv(None)?;
    manager.load_env()?;
    manager.site_settings()
}

fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
