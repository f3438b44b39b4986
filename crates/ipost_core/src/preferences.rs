//! Small key/value store for UI preferences, kept apart from the record
//! store. The only value the feed keeps here is the selected user.

use ipost_store::UserId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Key under which the selected user id is stored.
pub const SELECTED_USER_KEY: &str = "selected_user_id";

/// Result type for preference operations.
pub type PreferencesResult<T> = Result<T, PreferencesError>;

/// Errors from a preference store.
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// Reading or writing the preference file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The preference file is not valid JSON.
    #[error("invalid preference file: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value storage.
pub trait PreferenceStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> PreferencesResult<()>;

    /// Deletes a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be persisted.
    fn remove(&self, key: &str) -> PreferencesResult<()>;
}

impl<P: PreferenceStore + ?Sized> PreferenceStore for Arc<P> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> PreferencesResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> PreferencesResult<()> {
        (**self).remove(key)
    }
}

/// Process-local preferences.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryPreferences {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PreferencesResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PreferencesResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Preferences kept in a JSON object on disk.
///
/// Every change rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFilePreferences {
    /// Opens the file at `path`. A missing file starts out empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> PreferencesResult<Self> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), "opened preferences");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> PreferencesResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PreferencesResult<()> {
        let mut values = self.values.write();
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> PreferencesResult<()> {
        let mut values = self.values.write();
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&values) {
            values.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}

/// Typed view over a [`PreferenceStore`].
#[derive(Debug)]
pub struct UserPreferences<P> {
    store: P,
}

impl<P: PreferenceStore> UserPreferences<P> {
    /// Wraps a store.
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// The persisted selection. A value that is not a valid id reads as
    /// no selection.
    pub fn selected_user_id(&self) -> Option<UserId> {
        let raw = self.store.get(SELECTED_USER_KEY)?;
        match raw.parse() {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(value = %raw, error = %err, "ignoring unparsable selected user id");
                None
            }
        }
    }

    /// Persists `id` as the selection, or clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    pub fn set_selected_user_id(&self, id: Option<UserId>) -> PreferencesResult<()> {
        match id {
            Some(id) => self.store.set(SELECTED_USER_KEY, &id.to_string()),
            None => self.store.remove(SELECTED_USER_KEY),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &P {
        &self.store
    }
}
