use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "dodo-arcade";
const CONFIG_FILE: &str = "config.toml";
const FALLBACK_DATA_DIR: &str = ".dodo-arcade";

const ENV_DATA_DIR: &str = "DODO_ARCADE_DATA_DIR";
const ENV_SEED: &str = "DODO_ARCADE_SEED";

#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
    #[error("{name} must be an unsigned integer, got '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config
{
    /// Where `scores.json` and `arcade.log` are kept.
    pub data_dir: Option<PathBuf>,
    /// Write analytics events to the log.
    pub analytics: bool,
    /// Fixed RNG seed for every round. Random per round when unset.
    pub seed: Option<u64>,
    pub display: Display,
    pub input: Input,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            data_dir: None,
            analytics: true,
            seed: None,
            display: Display::default(),
            input: Input::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Display
{
    /// Milliseconds between two rendered frames.
    pub frame_ms: u64,
}

impl Default for Display
{
    fn default() -> Self
    {
        Self { frame_ms: 33 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Input
{
    /// Ticks a key counts as held after a press when the terminal does not
    /// report key releases.
    pub hold_frames: u32,
}

impl Default for Input
{
    fn default() -> Self
    {
        Self { hold_frames: 10 }
    }
}

impl Config
{
    pub fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let buf = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_str_at(&buf, path)
    }

    fn from_str_at(buf: &str, path: &Path) -> Result<Self, ConfigError>
    {
        toml::from_str(buf).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the explicit file if given, otherwise the per-user config file
    /// when it exists, otherwise defaults. Environment overrides are applied
    /// last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError>
    {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => {
                    log::debug!("loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };

        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            if !dir.is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(value) = lookup(ENV_SEED) {
            let seed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_SEED,
                    value: value.clone(),
                })?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf
    {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
    }

    pub fn scores_path(&self) -> PathBuf
    {
        self.data_dir().join("scores.json")
    }

    pub fn log_path(&self) -> PathBuf
    {
        self.data_dir().join("arcade.log")
    }
}

fn default_config_path() -> Option<PathBuf>
{
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn empty_file_gives_defaults()
    {
        let config = Config::from_str_at("", Path::new("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.display.frame_ms, 33);
        assert_eq!(config.input.hold_frames, 10);
        assert!(config.analytics);
    }

    #[test]
    fn partial_file_keeps_other_defaults()
    {
        let raw = "analytics = false\nseed = 7\n\n[input]\nhold_frames = 4\n";
        let config = Config::from_str_at(raw, Path::new("config.toml")).unwrap();
        assert!(!config.analytics);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.input.hold_frames, 4);
        assert_eq!(config.display.frame_ms, 33);
    }

    #[test]
    fn unknown_keys_are_rejected()
    {
        let err = Config::from_str_at("volume = 11\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn env_overrides_data_dir_and_seed()
    {
        let mut config = Config::default();
        config
            .apply_env(|name| match name {
                ENV_DATA_DIR => Some("/tmp/arcade".to_string()),
                ENV_SEED => Some("99".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/arcade"));
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.scores_path(), PathBuf::from("/tmp/arcade/scores.json"));
    }

    #[test]
    fn bad_seed_env_is_an_error()
    {
        let mut config = Config::default();
        let err = config
            .apply_env(|name| (name == ENV_SEED).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_SEED, .. }));
    }

    #[test]
    fn missing_file_reports_path()
    {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
