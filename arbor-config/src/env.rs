// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::env;

/// Reads prefixed variables into a nested settings object.
///
/// `ARBOR_MAX_REDIRECTS=5` becomes `{"max_redirects": 5}` and a double
/// underscore nests, so `ARBOR_LOG__LEVEL=debug` becomes
/// `{"log": {"level": "debug"}}`. Integer and boolean looking values are
/// converted.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load from the process environment
    pub fn load(&self) -> Result<Map<String, Value>> {
        Ok(self.collect(env::vars()))
    }

    /// Load from an explicit set of variables.
    pub fn collect<I, K, V>(&self, vars: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Map::new();
        for (key, value) in vars {
            let Some(key) = self.strip(key.as_ref()) else {
                continue;
            };
            let path: Vec<String> = key.split("__").map(str::to_lowercase).collect();
            if path.iter().any(String::is_empty) {
                continue;
            }
            insert_path(&mut config, &path, scalar(value.as_ref()));
        }
        config
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_'),
            None => Some(key),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{prefix}_{}", key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&full_key).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

pub(crate) fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = map;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

fn scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbor() -> EnvLoader {
        EnvLoader::new(Some("ARBOR".to_string()))
    }

    #[test]
    fn test_prefix_is_stripped() {
        let config = arbor().collect([
            ("ARBOR_SCOPE", "generic"),
            ("ARBORETUM", "x"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(config.len(), 1);
        assert_eq!(config["scope"], "generic");
    }

    #[test]
    fn test_double_underscore_nests() {
        let config = arbor().collect([("ARBOR_LOG__LEVEL", "debug"), ("ARBOR_LOG__FORMAT", "plain")]);
        assert_eq!(config["log"]["level"], "debug");
        assert_eq!(config["log"]["format"], "plain");
    }

    #[test]
    fn test_scalars_are_converted() {
        let config = arbor().collect([("ARBOR_MAX_REDIRECTS", "5"), ("ARBOR_FLAG", "TRUE")]);
        assert_eq!(config["max_redirects"], 5);
        assert_eq!(config["flag"], true);
    }

    #[test]
    fn test_malformed_keys_are_skipped() {
        let config = arbor().collect([("ARBOR_LOG__", "x"), ("ARBOR___A", "y")]);
        assert!(config.is_empty());
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        assert_eq!(loader.load_var_or("NONEXISTENT_VAR_12345", "default"), "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        assert!(arbor().load_var("MISSING_VAR_67890").is_err());
    }
}
