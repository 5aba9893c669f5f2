use crate::assets::DEFAULT_ASSET_BASE_URL;
use crate::logging::LogFormat;
use crate::session::DEFAULT_MAX_ID_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "DRAFTWATCH_CONFIG";
const ENV_PREFIX: &str = "DRAFTWATCH_";

/// Process configuration for the server binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// Card data JSON; the built-in sample catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// SQLite file; sessions stay in memory when unset
    pub database_path: Option<PathBuf>,
    pub asset_base_url: String,
    pub max_id_attempts: usize,
    pub log_format: LogFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            catalog_path: None,
            database_path: None,
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    catalog_path: Option<PathBuf>,
    #[serde(default)]
    database_path: Option<PathBuf>,
    #[serde(default)]
    asset_base_url: Option<String>,
    #[serde(default)]
    max_id_attempts: Option<usize>,
    #[serde(default)]
    log_format: Option<LogFormat>,
}

impl AppSettings {
    /// Defaults, then the TOML file (explicit path or `DRAFTWATCH_CONFIG`),
    /// then `DRAFTWATCH_*` variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SettingsError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = match config_path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let file: FileSettings = toml::from_str(raw)?;
        let mut settings = Self::default();
        if let Some(host) = file.host {
            settings.host = host;
        }
        if let Some(port) = file.port {
            settings.port = port;
        }
        if file.catalog_path.is_some() {
            settings.catalog_path = file.catalog_path;
        }
        if file.database_path.is_some() {
            settings.database_path = file.database_path;
        }
        if let Some(url) = file.asset_base_url {
            settings.asset_base_url = url;
        }
        if let Some(attempts) = file.max_id_attempts {
            settings.max_id_attempts = attempts;
        }
        if let Some(format) = file.log_format {
            settings.log_format = format;
        }
        Ok(settings)
    }

    /// Overrides from `DRAFTWATCH_*` keys. Empty values are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|value| !value.trim().is_empty())
        };

        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_env("PORT", &port)?;
        }
        if let Some(path) = var("CATALOG") {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = var("ASSET_BASE_URL") {
            self.asset_base_url = url;
        }
        if let Some(attempts) = var("MAX_ID_ATTEMPTS") {
            self.max_id_attempts = parse_env("MAX_ID_ATTEMPTS", &attempts)?;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.log_format = format.parse().map_err(SettingsError::InvalidValue)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "host cannot be empty".to_string(),
            ));
        }

        if self.max_id_attempts == 0 {
            return Err(SettingsError::InvalidValue(
                "max_id_attempts must be at least 1".to_string(),
            ));
        }

        if self.asset_base_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "asset_base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| {
        SettingsError::InvalidValue(format!("{ENV_PREFIX}{name} has invalid value `{value}`"))
    })
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid setting: {0}")]
    InvalidValue(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed settings file: {0}")]
    Parse(#[from] toml::de::Error),
}
