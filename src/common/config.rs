use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::Error;

/// Settings read from `config.toml`
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the configuration file format
    pub version: Version,
    /// Database URL, defaults to `polls.db` in the local data directory
    pub database_url: Option<String>,
    /// How many questions the index shows
    pub latest_limit: u64,
    /// Log every SQL statement
    pub sqlx_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: Version::new(0, 1, 0),
            database_url: None,
            latest_limit: 5,
            sqlx_logging: false,
        }
    }
}

impl Config {
    /// Application name used for the platform directories
    pub const APP_NAME: &'static str = "polls";

    const CONFIG_FILE_NAME: &'static str = "config.toml";
    const CONFIG_VERSION: &'static str = "0.1.0";
    const DATABASE_FILE_NAME: &'static str = "polls.db";

    /// Load the config file from the platform config directory, falling back
    /// to defaults when it does not exist
    pub async fn load() -> Result<Self, Error> {
        let mut config_file_path = crate::config_dir_path(Config::APP_NAME)?;
        config_file_path.push(Config::CONFIG_FILE_NAME);

        if config_file_path.exists() {
            Config::load_from(config_file_path).await
        } else {
            info!(
                "No config file at `{}`, using defaults",
                config_file_path.display()
            );

            Ok(Config::default())
        }
    }

    /// Load a config file that must exist
    pub async fn load_from<T>(path: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        let path = path.as_ref();
        info!("The config file is located at: `{}`", path.display());

        let config = fs::read_to_string(path).await?;
        Config::from_toml(&config)
    }

    /// Parse a config file, an incompatible version yields the defaults
    pub fn from_toml<T>(text: T) -> Result<Self, Error>
    where
        T: AsRef<str>,
    {
        let config: Config = toml::from_str(text.as_ref())?;

        let req = VersionReq::parse(&format!("^{}", Config::CONFIG_VERSION))?;
        if !req.matches(&config.version) {
            warn!("Ignoring the configuration file because the configuration file version is incompatible");
            Ok(Config::default())
        } else {
            Ok(config)
        }
    }

    /// Render as a config file
    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string(self)?)
    }

    /// Path of the database file used when no URL is configured
    pub fn default_database_path() -> Result<PathBuf, Error> {
        let mut db_path = crate::data_dir_path(Config::APP_NAME)?;
        db_path.push(Config::DATABASE_FILE_NAME);

        Ok(db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file() -> Result<(), Error> {
        let config = Config::from_toml("latest_limit = 10")?;

        assert_eq!(
            config,
            Config {
                latest_limit: 10,
                ..Default::default()
            }
        );

        Ok(())
    }

    #[test]
    fn full_file() -> Result<(), Error> {
        let config = Config::from_toml(
            r#"
            version = "0.1.3"
            database_url = "sqlite::memory:"
            latest_limit = 2
            sqlx_logging = true
            "#,
        )?;

        assert_eq!(config.version, Version::new(0, 1, 3));
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.latest_limit, 2);
        assert!(config.sqlx_logging);

        Ok(())
    }

    #[test]
    fn incompatible_version() -> Result<(), Error> {
        let config = Config::from_toml(
            r#"
            version = "1.0.0"
            latest_limit = 99
            "#,
        )?;

        assert_eq!(config, Config::default());

        Ok(())
    }

    #[test]
    fn malformed_file() {
        assert!(matches!(
            Config::from_toml("latest_limit = \"five\""),
            Err(Error::TomlDe(_))
        ));
    }

    #[test]
    fn to_toml() -> Result<(), Error> {
        let config = Config {
            database_url: Some("sqlite://polls.db?mode=rwc".to_string()),
            ..Default::default()
        };

        assert_eq!(Config::from_toml(config.to_toml()?)?, config);

        Ok(())
    }

    #[tokio::test]
    async fn load_from() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "latest_limit = 3\n").await?;

        assert_eq!(Config::load_from(&path).await?.latest_limit, 3);
        assert!(matches!(
            Config::load_from(dir.path().join("missing.toml")).await,
            Err(Error::StdIo(_))
        ));

        Ok(())
    }
}
