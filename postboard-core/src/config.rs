use crate::error::ConfigError;
use crate::types::AppConfig;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

pub const CONFIG_PATH_ENV: &str = "POSTBOARD_CONFIG";
pub const POSTS_ENDPOINT_ENV: &str = "POSTBOARD_POSTS_ENDPOINT";
pub const DATABASE_URL_ENV: &str = "POSTBOARD_DATABASE_URL";
pub const DEFAULT_CONFIG_FILE: &str = "postboard.toml";

impl AppConfig {
    /// Parses a TOML document. Missing fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No configuration file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(ConfigError::ValidationFailed {
                reason: format!("could not read {}: {}", path.display(), e),
            }),
        }
    }

    /// Loads the file named by `POSTBOARD_CONFIG` (or `postboard.toml`) and
    /// then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(POSTS_ENDPOINT_ENV) {
            debug!("Posts endpoint overridden from environment");
            self.posts_endpoint = endpoint;
        }
        if let Some(database_url) = lookup(DATABASE_URL_ENV) {
            debug!("Database URL overridden from environment");
            self.database_url = database_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint =
            Url::parse(&self.posts_endpoint).map_err(|_| ConfigError::InvalidValue {
                field: "posts_endpoint".to_string(),
                value: self.posts_endpoint.clone(),
            })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "posts_endpoint".to_string(),
                value: self.posts_endpoint.clone(),
            });
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database_url".to_string(),
                value: self.database_url.clone(),
            });
        }

        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs.map(std::time::Duration::from_secs)
    }
}
