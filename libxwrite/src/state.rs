//! Persisted key-value state
//!
//! Holds the small scalars xwrite keeps between runs: the quota counter and
//! epoch start, the lifetime post count and the last verified username.
//! Stores are passed explicitly into the operations that need them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{Result, StateError};

/// Posts made in the current quota epoch
pub const TWEET_COUNT_KEY: &str = "tweetCount";
/// Start of the current quota epoch, epoch milliseconds
pub const LAST_RESET_KEY: &str = "lastResetTimestamp";
/// Successful posts ever made
pub const LIFETIME_COUNT_KEY: &str = "lifetimeTweetCount";
/// Handle of the last account whose credentials verified
pub const CACHED_USERNAME_KEY: &str = "cachedUsername";

/// Key-value store for persisted scalars
pub trait StateStore: Send + Sync {
    fn get_int(&self, key: &str) -> Result<Option<i64>>;

    fn set_int(&self, key: &str, value: i64) -> Result<()>;

    fn get_text(&self, key: &str) -> Result<Option<String>>;

    fn set_text(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.get_int(key)?.unwrap_or(default))
    }
}

type StateMap = BTreeMap<String, toml::Value>;

fn read_int(map: &StateMap, key: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(v)) => Ok(Some(*v)),
        Some(_) => Err(StateError::WrongType {
            key: key.to_string(),
            expected: "integer",
        }
        .into()),
    }
}

fn read_text(map: &StateMap, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(toml::Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(StateError::WrongType {
            key: key.to_string(),
            expected: "string",
        }
        .into()),
    }
}

/// State persisted to a TOML file
///
/// The whole map is rewritten after every mutation, through a temp file that
/// is renamed over the old one. A mutation only reaches memory once the write
/// succeeded. A missing file starts empty; a file that fails to parse is
/// logged and replaced on next write.
#[derive(Clone)]
pub struct FileStateStore {
    path: PathBuf,
    state: Arc<RwLock<StateMap>>,
}

impl FileStateStore {
    /// Open the store at `path`, loading existing state if present
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = Self::load(&path)?;
        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<StateMap> {
        if !path.exists() {
            return Ok(StateMap::new());
        }

        let content = std::fs::read_to_string(path).map_err(StateError::Io)?;
        match toml::from_str::<StateMap>(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    "State file {} is corrupted ({}), starting from empty state",
                    path.display(),
                    e
                );
                Ok(StateMap::new())
            }
        }
    }

    fn save(&self, state: &StateMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StateError::Io)?;
        }

        let content = toml::to_string_pretty(state).map_err(StateError::Serialize)?;
        let temp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content).map_err(StateError::Io)?;
        std::fs::rename(&temp_path, &self.path).map_err(StateError::Io)?;

        tracing::trace!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut StateMap)) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let mut updated = state.clone();
        f(&mut updated);
        self.save(&updated)?;
        *state = updated;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        read_int(&self.state.read().unwrap(), key)
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.mutate(|state| {
            state.insert(key.to_string(), toml::Value::Integer(value));
        })
    }

    fn get_text(&self, key: &str) -> Result<Option<String>> {
        read_text(&self.state.read().unwrap(), key)
    }

    fn set_text(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|state| {
            state.insert(key.to_string(), toml::Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.state.read().unwrap().contains_key(key) {
            return Ok(());
        }
        self.mutate(|state| {
            state.remove(key);
        })
    }
}

/// In-process state, lost on drop
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    state: Arc<RwLock<StateMap>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        read_int(&self.state.read().unwrap(), key)
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.state
            .write()
            .unwrap()
            .insert(key.to_string(), toml::Value::Integer(value));
        Ok(())
    }

    fn get_text(&self, key: &str) -> Result<Option<String>> {
        read_text(&self.state.read().unwrap(), key)
    }

    fn set_text(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .unwrap()
            .insert(key.to_string(), toml::Value::String(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.state.write().unwrap().remove(key);
        Ok(())
    }
}
