use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::views::table::DEFAULT_PAGE_SIZE;

pub const DEFAULT_DATABASE: &str = "helpdesk";
pub const DEFAULT_STORE: &str = "tickets";
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_ENV: &str = "HELPDESK_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database: String,
    pub store: String,
    pub schema_version: u32,
    pub page_size: usize,
}

impl AppConfig {
    /// Defaults, then the stored config file, then `HELPDESK_*` variables.
    pub fn load() -> AppResult<Self> {
        let config_dir = config_directory()?;
        let stored = StoredConfig::load()?;
        Self::resolve(config_dir, stored.overlay(StoredConfig::from_env()))
    }

    pub fn resolve(config_dir: PathBuf, settings: StoredConfig) -> AppResult<Self> {
        let schema_version = match settings.schema_version.as_deref() {
            Some(raw) => parse_positive::<u32>("schema version", raw)?,
            None => DEFAULT_SCHEMA_VERSION,
        };
        let page_size = match settings.page_size.as_deref() {
            Some(raw) => parse_positive::<usize>("page size", raw)?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            data_dir: settings.data_dir.map(PathBuf::from).unwrap_or(config_dir),
            database: settings
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            store: settings.store.unwrap_or_else(|| DEFAULT_STORE.to_string()),
            schema_version,
            page_size,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.database))
    }
}

/// Settings as written by `config init`; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str::<StoredConfig>(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid config file: {err}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn from_env() -> Self {
        Self {
            data_dir: env_value("HELPDESK_DATA_DIR"),
            database: env_value("HELPDESK_DATABASE"),
            store: env_value("HELPDESK_STORE"),
            schema_version: env_value("HELPDESK_SCHEMA_VERSION"),
            page_size: env_value("HELPDESK_PAGE_SIZE"),
        }
    }

    /// Values set in `top` win over the ones in `self`.
    pub fn overlay(self, top: StoredConfig) -> Self {
        Self {
            data_dir: top.data_dir.or(self.data_dir),
            database: top.database.or(self.database),
            store: top.store.or(self.store),
            schema_version: top.schema_version.or(self.schema_version),
            page_size: top.page_size.or(self.page_size),
        }
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Some(dir) = env_value(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = env::var_os("HOME").ok_or_else(|| {
        AppError::Configuration(format!("HOME is not set; set {CONFIG_DIR_ENV} instead"))
    })?;
    Ok(PathBuf::from(home).join(".config").join("helpdesk"))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validates a schema version as typed into the wizard.
pub fn check_schema_version(raw: &str) -> AppResult<()> {
    parse_positive::<u32>("schema version", raw).map(|_| ())
}

/// Validates a page size as typed into the wizard.
pub fn check_page_size(raw: &str) -> AppResult<()> {
    parse_positive::<usize>("page size", raw).map(|_| ())
}

fn parse_positive<T>(field: &str, raw: &str) -> AppResult<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|_| AppError::Configuration(format!("{field} must be a number, got '{raw}'")))?;
    if value == T::default() {
        return Err(AppError::Configuration(format!(
            "{field} must be at least 1"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_defaults() {
        let config = AppConfig::resolve(PathBuf::from("/tmp/desk"), StoredConfig::default())
            .unwrap();

        assert_eq!(
            config,
            AppConfig {
                data_dir: PathBuf::from("/tmp/desk"),
                database: DEFAULT_DATABASE.to_string(),
                store: DEFAULT_STORE.to_string(),
                schema_version: 1,
                page_size: 50,
            }
        );
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/desk/helpdesk.json")
        );
    }

    #[test]
    fn overlay_prefers_top_values() {
        let stored = StoredConfig {
            database: Some("stored".to_string()),
            page_size: Some("20".to_string()),
            ..StoredConfig::default()
        };
        let env = StoredConfig {
            page_size: Some("10".to_string()),
            ..StoredConfig::default()
        };

        let config = AppConfig::resolve(PathBuf::from("/cfg"), stored.overlay(env)).unwrap();

        assert_eq!(config.database, "stored");
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn rejects_invalid_numbers() {
        for (version, page_size) in [(Some("0"), None), (None, Some("0")), (None, Some("ten"))] {
            let settings = StoredConfig {
                schema_version: version.map(str::to_string),
                page_size: page_size.map(str::to_string),
                ..StoredConfig::default()
            };
            assert!(matches!(
                AppConfig::resolve(PathBuf::from("/cfg"), settings),
                Err(AppError::Configuration(_))
            ));
        }
    }

    #[test]
    fn checks_numeric_fields_as_typed() {
        assert!(check_schema_version("3").is_ok());
        assert!(check_page_size(" 25 ").is_ok());
        assert!(matches!(
            check_schema_version("two"),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(check_page_size("0"), Err(AppError::Configuration(_))));
        assert!(check_schema_version("-1").is_err());
    }

    #[test]
    fn stored_config_round_trips_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE_NAME);
        assert_eq!(StoredConfig::load_from(&path).unwrap(), StoredConfig::default());

        let stored = StoredConfig {
            data_dir: Some("/srv/helpdesk".to_string()),
            schema_version: Some("2".to_string()),
            ..StoredConfig::default()
        };
        stored.save_to(&path).unwrap();

        assert_eq!(StoredConfig::load_from(&path).unwrap(), stored);
    }

    #[test]
    fn invalid_file_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            StoredConfig::load_from(&path),
            Err(AppError::Configuration(_))
        ));
    }
}
