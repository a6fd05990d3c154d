//! Persisted configuration and the per-run settings derived from it.
//!
//! The config file is a flat YAML mapping stored at `~/.whereis.yaml`.
//! Recognised keys may be overridden from the environment; overrides are
//! visible through [`ConfigStore::get`] but never written back by
//! [`ConfigStore::save`].

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::local::{CompareMode, CITY_DB_FILENAME};

/// Key holding the Fastah API key.
pub const API_KEY: &str = "fastah-api-key";

/// Keys that may be overridden from the environment.
pub const RECOGNIZED_KEYS: &[&str] = &[API_KEY];

const CONFIG_FILENAME: &str = ".whereis.yaml";

/// The user's home directory, from `HOME` (or `USERPROFILE` on Windows).
pub fn home_dir() -> Result<Utf8PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .map(Utf8PathBuf::from)
        .ok_or(Error::HomeDirUnavailable)
}

/// Default config file location, `~/.whereis.yaml`.
pub fn default_path() -> Result<Utf8PathBuf> {
    Ok(home_dir()?.join(CONFIG_FILENAME))
}

/// Default local database location, `~/GeoLite2-City.mmdb`.
pub fn default_database_path() -> Result<Utf8PathBuf> {
    Ok(home_dir()?.join(CITY_DB_FILENAME))
}

/// Environment variable consulted for `key`: upper-cased, `-` replaced by `_`.
pub fn env_var_name(key: &str) -> String {
    key.to_ascii_uppercase().replace('-', "_")
}

/// A YAML key/value config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Utf8PathBuf,
    values: Mapping,
    overrides: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Load the config at `path`. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Mapping::new(),
            Ok(text) => serde_yaml::from_str(&text).map_err(|source| Error::ConfigParse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(%path, "no config file, starting empty");
                Mapping::new()
            }
            Err(source) => return Err(Error::ConfigRead { path, source }),
        };

        Ok(Self {
            path,
            values,
            overrides: BTreeMap::new(),
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides for recognised keys using `lookup` to resolve
    /// environment variable names.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in RECOGNIZED_KEYS {
            if let Some(value) = lookup(&env_var_name(key)) {
                debug!(key, "config value overridden from environment");
                self.overrides.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The value of `key`, with environment overrides taking precedence.
    ///
    /// Non-string scalars in the file are returned in their YAML form.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Set `key` in the file values. Takes effect on disk after [`save`](Self::save).
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.overrides.remove(key);
        self.values
            .insert(Value::String(key.to_string()), Value::String(value));
    }

    /// Write the file values (not the overrides) back to disk.
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&self.values).map_err(|source| Error::ConfigEncode {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| Error::ConfigWrite {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path, "config saved");
        Ok(())
    }
}

/// Everything one lookup run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub endpoint: String,
    pub database_path: Utf8PathBuf,
    pub compare: CompareMode,
    pub report_invalid: bool,
}

impl Settings {
    /// Resolve settings from `store`; fails if no API key is configured.
    pub fn resolve(
        store: &ConfigStore,
        endpoint: impl Into<String>,
        database_path: Utf8PathBuf,
        compare: CompareMode,
        report_invalid: bool,
    ) -> Result<Self> {
        let api_key = store
            .get(API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(Error::MissingApiKey)?;

        Ok(Self {
            api_key,
            endpoint: endpoint.into(),
            database_path,
            compare,
            report_invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::DEFAULT_ENDPOINT;

    fn temp_config() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(CONFIG_FILENAME)).unwrap();
        (dir, path)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_is_empty() {
        let (_dir, path) = temp_config();
        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.get(API_KEY), None);
        assert!(!path.exists());
    }

    #[test]
    fn api_key_round_trips_through_the_file() {
        let (_dir, path) = temp_config();

        let mut store = ConfigStore::load(&path).unwrap();
        store.set(API_KEY, "0123456789abcdef");
        store.save().unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get(API_KEY).as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn set_overwrites_and_keeps_other_keys() {
        let (_dir, path) = temp_config();
        fs::write(&path, "fastah-api-key: old\ngreeting: hello\n").unwrap();

        let mut store = ConfigStore::load(&path).unwrap();
        store.set(API_KEY, "new");
        store.save().unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get(API_KEY).as_deref(), Some("new"));
        assert_eq!(reloaded.get("greeting").as_deref(), Some("hello"));
    }

    #[test]
    fn environment_overrides_file_but_is_not_saved() {
        let (_dir, path) = temp_config();
        fs::write(&path, "fastah-api-key: from-file\n").unwrap();

        let store = ConfigStore::load(&path)
            .unwrap()
            .with_overrides_from(|name| (name == "FASTAH_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(store.get(API_KEY).as_deref(), Some("from-env"));

        store.save().unwrap();
        let reloaded = ConfigStore::load(&path).unwrap().with_overrides_from(no_env);
        assert_eq!(reloaded.get(API_KEY).as_deref(), Some("from-file"));
    }

    #[test]
    fn env_var_names() {
        assert_eq!(env_var_name(API_KEY), "FASTAH_API_KEY");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let (_dir, path) = temp_config();
        fs::write(&path, "- just\n- a list\n").unwrap();
        assert!(matches!(
            ConfigStore::load(&path),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn settings_require_an_api_key() {
        let (_dir, path) = temp_config();
        fs::write(&path, "fastah-api-key: '   '\n").unwrap();
        let store = ConfigStore::load(&path).unwrap();

        let err = Settings::resolve(
            &store,
            DEFAULT_ENDPOINT,
            Utf8PathBuf::from(CITY_DB_FILENAME),
            CompareMode::Auto,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingApiKey));
    }

    #[test]
    fn settings_carry_the_key() {
        let (_dir, path) = temp_config();
        let mut store = ConfigStore::load(&path).unwrap();
        store.set(API_KEY, "secret");

        let settings = Settings::resolve(
            &store,
            DEFAULT_ENDPOINT,
            Utf8PathBuf::from(CITY_DB_FILENAME),
            CompareMode::Never,
            true,
        )
        .unwrap();
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert!(settings.report_invalid);
    }
}
