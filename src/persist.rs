//! Persisted user preferences
//!
//! Only the sort settings and the favorites survive a restart. Market data
//! is always fetched fresh.

use crate::{
    error::PersistError,
    favorites::FavoritesSnapshot,
    types::{SortOrder, SortType},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Bump when the stored layout changes
const STATE_VERSION: u32 = 1;

/// The persisted subset of tracker state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub version: u32,
    pub sort_type: SortType,
    pub sort_order: SortOrder,
    pub favorites: FavoritesSnapshot,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            sort_type: SortType::default(),
            sort_order: SortOrder::default(),
            favorites: FavoritesSnapshot::default(),
        }
    }
}

/// Where persisted state is kept
pub trait PreferenceStorage: Send + Sync {
    /// Reads the stored state; nothing stored yet yields the defaults
    fn load(&self) -> Result<PersistedState, PersistError>;

    /// Replaces the stored state
    fn save(&self, state: &PersistedState) -> Result<(), PersistError>;
}

/// JSON document on disk
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStorage for JsonFileStorage {
    fn load(&self) -> Result<PersistedState, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored preferences, using defaults");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(PersistError::io(&self.path, e)),
        };

        let mut state: PersistedState = serde_json::from_slice(&bytes)?;
        if state.version == 0 {
            state.version = STATE_VERSION;
        }
        Ok(state)
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(state)?;
        atomic_write(&self.path, &json)?;
        tracing::debug!(path = %self.path.display(), "Preferences saved");
        Ok(())
    }
}

/// Writes to a sibling temp file, then renames it over `path`
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PersistError::io(&dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preferences.json".to_string());
    let tmp = dir.join(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&tmp).map_err(|e| PersistError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| PersistError::io(&tmp, e))?;
        file.sync_all().map_err(|e| PersistError::io(&tmp, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| PersistError::io(path, e))
}

/// Storage that lives as long as the process
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn load(&self) -> Result<PersistedState, PersistError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.clone().unwrap_or_default())
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }
}
