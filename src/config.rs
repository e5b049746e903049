//! Runtime configuration.
//!
//! Each setting is resolved from, in order: command-line flag, environment
//! variable, `config.json` in the data directory, built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const ENV_HOME: &str = "OPS_HOME";
pub const ENV_USER: &str = "OPS_USER";
pub const ENV_API_URL: &str = "OPS_API_URL";
pub const CONFIG_FILE: &str = "config.json";

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
    /// Custom daily mission table, see [`crate::catalog::Catalog::load`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl ConfigFile {
    /// Read `config.json`, treating a missing or broken file as empty.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let Ok(raw) = fs::read_to_string(&path) else {
            return ConfigFile::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            ConfigFile::default()
        })
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        fs::write(data_dir.join(CONFIG_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub api_url: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user: Option<String>,
    /// API root for remote sync. `None` keeps everything local.
    pub api_url: Option<String>,
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// Resolve against the process environment.
    pub fn from_env(overrides: Overrides) -> Self {
        Config::resolve(overrides, |k| std::env::var(k).ok())
    }

    pub fn resolve(overrides: Overrides, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let data_dir = overrides
            .data_dir
            .or_else(|| non_empty(env(ENV_HOME)).map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir(env("HOME")));
        let file = ConfigFile::load(&data_dir);

        let user = non_empty(overrides.user)
            .or_else(|| non_empty(env(ENV_USER)))
            .or(file.default_user);
        let api_url = non_empty(overrides.api_url)
            .or_else(|| non_empty(env(ENV_API_URL)))
            .or(file.api_url);
        let catalog = file.catalog.map(|p| if p.is_relative() { data_dir.join(p) } else { p });

        Config { data_dir, user, api_url, catalog }
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    PathBuf::from(home.unwrap_or_else(|| ".".to_string())).join(".partner-ops")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_to_home_directory() {
        let cfg = Config::resolve(Overrides::default(), env_of(&[("HOME", "/nonexistent/home")]));
        assert_eq!(cfg.data_dir, PathBuf::from("/nonexistent/home/.partner-ops"));
        assert_eq!(cfg.user, None);
        assert_eq!(cfg.api_url, None);
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        ConfigFile {
            api_url: Some("http://file/api".into()),
            default_user: Some("file@x.cz".into()),
            catalog: Some(PathBuf::from("missions.json")),
        }
        .save(dir.path())
        .unwrap();
        let home = dir.path().to_string_lossy().to_string();

        let from_file = Config::resolve(Overrides::default(), env_of(&[(ENV_HOME, home.as_str())]));
        assert_eq!(from_file.user.as_deref(), Some("file@x.cz"));
        assert_eq!(from_file.api_url.as_deref(), Some("http://file/api"));
        assert_eq!(from_file.catalog, Some(dir.path().join("missions.json")));

        let from_env = Config::resolve(
            Overrides::default(),
            env_of(&[(ENV_HOME, home.as_str()), (ENV_USER, "env@x.cz"), (ENV_API_URL, "")]),
        );
        assert_eq!(from_env.user.as_deref(), Some("env@x.cz"));
        assert_eq!(from_env.api_url.as_deref(), Some("http://file/api"));

        let from_flag = Config::resolve(
            Overrides { user: Some("flag@x.cz".into()), ..Default::default() },
            env_of(&[(ENV_HOME, home.as_str()), (ENV_USER, "env@x.cz")]),
        );
        assert_eq!(from_flag.user.as_deref(), Some("flag@x.cz"));
    }

    #[test]
    fn malformed_config_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[1, 2").unwrap();
        assert_eq!(ConfigFile::load(dir.path()), ConfigFile::default());
    }
}
