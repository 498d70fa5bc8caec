use crate::error::{Error, Result};
use crate::preference::FileStore;
use crate::scanner::ExclusionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// One step more verbose per count, saturating at trace.
    pub fn raised(self, steps: u8) -> Self {
        let levels = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let index = levels.iter().position(|l| *l == self).unwrap_or(1);
        levels[(index + steps as usize).min(levels.len() - 1)]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub exclude_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: Option<PathBuf>,
    pub preferences: Option<PathBuf>,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// `<config dir>/rootsweep/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::APP_NAME).join("config.toml"))
    }

    /// Reads `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::Config {
                    path,
                    message: err.to_string(),
                });
            }
        };

        toml::from_str(&text).map_err(|err| Error::Config {
            path,
            message: err.to_string(),
        })
    }

    /// Configured prefixes plus `extra` from the command line.
    pub fn exclusion_policy(&self, extra: &[String]) -> ExclusionPolicy {
        ExclusionPolicy::with_prefixes(self.scan.exclude_prefixes.iter().chain(extra).cloned())
    }

    /// Explicit root, else the configured one, else the home directory.
    pub fn resolve_root(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.root.clone())
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn preference_store(&self) -> FileStore {
        let path = self
            .preferences
            .clone()
            .or_else(FileStore::default_path)
            .unwrap_or_else(|| PathBuf::from("rootsweep-preferences.toml"));
        FileStore::new(path)
    }
}
