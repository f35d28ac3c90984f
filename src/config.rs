use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "preprocessor.toml";
pub const CONFIG_PATH_ENV: &str = "PREPROCESSOR_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Front-end build served for every non-API path
    pub static_dir: PathBuf,
    /// Number of processed files kept after each upload
    pub keep_processed: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            keep_processed: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "app.log".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `preprocessor.toml` (or `$PREPROCESSOR_CONFIG`) if present, then
    /// apply environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            Self::default()
        };

        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `PREPROCESSOR_*` variables looked up via `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PREPROCESSOR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env(&lookup, "PREPROCESSOR_PORT")? {
            self.server.port = port;
        }
        if let Some(limit) = parse_env(&lookup, "PREPROCESSOR_MAX_UPLOAD_BYTES")? {
            self.server.max_upload_bytes = limit;
        }
        if let Some(dir) = lookup("PREPROCESSOR_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PREPROCESSOR_STATIC_DIR") {
            self.storage.static_dir = PathBuf::from(dir);
        }
        if let Some(keep) = parse_env(&lookup, "PREPROCESSOR_KEEP_PROCESSED")? {
            self.storage.keep_processed = keep;
        }
        if let Some(dir) = lookup("PREPROCESSOR_LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Env {
            name: name.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.storage.keep_processed, 3);
        assert_eq!(config.logging.file_name, "app.log");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 8080

            [storage]
            static_dir = "frontend/build"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.static_dir, PathBuf::from("frontend/build"));
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = AppConfig::from_toml("[server]\nport = \"eighty\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup_from(&[
                ("PREPROCESSOR_HOST", "127.0.0.1"),
                ("PREPROCESSOR_PORT", " 9000 "),
                ("PREPROCESSOR_KEEP_PROCESSED", "5"),
                ("PREPROCESSOR_UPLOAD_DIR", "/tmp/uploads"),
            ]))
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.keep_processed, 5);
        assert_eq!(config.storage.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.storage.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(lookup_from(&[("PREPROCESSOR_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref name, .. } if name == "PREPROCESSOR_PORT"));
    }
}
