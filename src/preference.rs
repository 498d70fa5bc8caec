use crate::error::{Error, Result};
use crate::sorter::SortingPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Key-value backend for the sorting preference.
pub trait PreferenceStore {
    fn load(&self) -> Result<Option<SortingPolicy>>;
    fn save(&mut self, policy: SortingPolicy) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    value: Option<SortingPolicy>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(policy: SortingPolicy) -> Self {
        Self { value: Some(policy) }
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<Option<SortingPolicy>> {
        Ok(self.value)
    }

    fn save(&mut self, policy: SortingPolicy) -> Result<()> {
        self.value = Some(policy);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sorting: Option<SortingPolicy>,
}

/// Preferences kept in a small TOML file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/rootsweep/preferences.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::APP_NAME).join("preferences.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl ToString) -> Error {
        Error::Preference {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl PreferenceStore for FileStore {
    fn load(&self) -> Result<Option<SortingPolicy>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.error(err)),
        };
        let file: PreferencesFile = toml::from_str(&text).map_err(|err| self.error(err))?;
        Ok(file.sorting)
    }

    fn save(&mut self, policy: SortingPolicy) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.error(err))?;
        }
        let text = toml::to_string(&PreferencesFile {
            sorting: Some(policy),
        })
        .map_err(|err| self.error(err))?;
        fs::write(&self.path, text).map_err(|err| self.error(err))
    }
}

/// Current sorting policy, cycled and persisted through a [`PreferenceStore`].
#[derive(Debug)]
pub struct SortingPreference<S> {
    store: S,
    current: SortingPolicy,
}

impl<S: PreferenceStore> SortingPreference<S> {
    /// Falls back to the default policy when the store is empty or unreadable.
    pub fn load(store: S) -> Self {
        let current = match store.load() {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable sorting preference");
                SortingPolicy::default()
            }
        };
        Self { store, current }
    }

    pub fn current(&self) -> SortingPolicy {
        self.current
    }

    /// Moves to the next policy and persists it.
    pub fn advance(&mut self) -> Result<SortingPolicy> {
        let next = self.current.next();
        self.set(next)?;
        Ok(next)
    }

    pub fn set(&mut self, policy: SortingPolicy) -> Result<()> {
        self.store.save(policy)?;
        self.current = policy;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
