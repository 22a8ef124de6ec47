//! User configuration file
//!
//! A sectioned key/value store kept as JSON (`{"section": {"key": "value"}}`).
//! Keys without an explicit section live in `settings`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use efu_core::config::{ConfigSource, Credentials};
use tracing::debug;

use crate::error::CliError;

/// Section used when none is given
pub const DEFAULT_SECTION: &str = "settings";
/// Section holding server credentials
pub const AUTH_SECTION: &str = "auth";
/// Access key id, in [`AUTH_SECTION`]
pub const ACCESS_ID: &str = "access_id";
/// Secret access key, in [`AUTH_SECTION`]
pub const ACCESS_SECRET: &str = "access_secret";
/// Private key path, in [`DEFAULT_SECTION`]
pub const PRIVATE_KEY_PATH: &str = "private_key_path";

type Sections = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    sections: Sections,
}

impl Config {
    /// Default location: `~/.efu`
    pub fn default_path() -> Result<PathBuf, CliError> {
        dirs::home_dir()
            .map(|home| home.join(".efu"))
            .ok_or_else(|| {
                CliError::InvalidConfiguration(
                    "cannot determine home directory; set EFU_GLOBAL_CONFIG".to_string(),
                )
            })
    }

    /// Load the file at `path`; a missing file is an empty configuration
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sections = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Sections>(&bytes).map_err(|e| {
                CliError::InvalidConfiguration(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Sections::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        debug!(path = ?path, sections = sections.len(), "Loaded configuration");
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str, section: Option<&str>) -> Option<&str> {
        self.sections
            .get(section.unwrap_or(DEFAULT_SECTION))
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str, section: Option<&str>) {
        self.sections
            .entry(section.unwrap_or(DEFAULT_SECTION).to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Write the configuration back, replacing the file atomically
    pub fn save(&self) -> Result<()> {
        let mut json = serde_json::to_string_pretty(&self.sections)?;
        json.push('\n');
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        std::fs::write(&temp_path, json)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        debug!(path = ?self.path, "Saved configuration");
        Ok(())
    }
}

impl ConfigSource for Config {
    fn credentials(&self) -> Option<Credentials> {
        let access_key = self.get(ACCESS_ID, Some(AUTH_SECTION))?;
        let secret_key = self.get(ACCESS_SECRET, Some(AUTH_SECTION))?;
        Some(Credentials {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn private_key_path(&self) -> Option<PathBuf> {
        self.get(PRIVATE_KEY_PATH, None).map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_missing_file_is_empty() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = Config::load(dir.path().join("config"))?;
        assert_eq!(config.get("foo", None), None);
        assert!(config.credentials().is_none());
        Ok(())
    }

    #[test]
    fn test_set_save_load() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config");
        let mut config = Config::load(&path)?;
        config.set("foo", "bar", None);
        config.set("foo", "baz", Some("section"));
        config.save()?;

        let config = Config::load(&path)?;
        assert_eq!(config.get("foo", None), Some("bar"));
        assert_eq!(config.get("foo", Some(DEFAULT_SECTION)), Some("bar"));
        assert_eq!(config.get("foo", Some("section")), Some("baz"));
        assert!(!dir.path().join("config.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_config_source() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut config = Config::load(dir.path().join("config"))?;
        config.set(ACCESS_ID, "id", Some(AUTH_SECTION));
        assert!(config.credentials().is_none());
        config.set(ACCESS_SECRET, "secret", Some(AUTH_SECTION));
        config.set(PRIVATE_KEY_PATH, "/keys/efu.pem", None);

        assert_eq!(
            config.credentials(),
            Some(Credentials {
                access_key: "id".to_string(),
                secret_key: "secret".to_string(),
            })
        );
        assert_eq!(config.private_key_path(), Some(PathBuf::from("/keys/efu.pem")));
        Ok(())
    }

    #[test]
    fn test_malformed_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config");
        std::fs::write(&path, "[auth]\naccess_id = x\n")?;
        let err = match Config::load(&path) {
            Ok(_) => return Err("malformed configuration was accepted".into()),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidConfiguration(_))
        ));
        Ok(())
    }
}
