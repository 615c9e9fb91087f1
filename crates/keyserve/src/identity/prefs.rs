//! File-backed preference persistence.
//!
//! A single JSON file holding a flat string map. Writes are rare and
//! user-driven; last write wins, no transactional guarantees.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use common::{PreferenceError, PreferenceStore};

/// [`PreferenceStore`] backed by a JSON file on disk.
///
/// A missing file reads as "nothing set". Every `set` rewrites the whole
/// file; a process-local mutex serialises concurrent writers.
pub struct FilePreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    /// Create a store persisting to `path`. The file is created lazily on
    /// the first `set`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>, PreferenceError> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| PreferenceError::Storage(format!("corrupt preference file: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PreferenceError::Storage(format!(
                "failed to read preference file: {e}"
            ))),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(Self::load(&self.path)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PreferenceError::Storage("preference write lock poisoned".into()))?;

        let mut map = Self::load(&self.path)?;
        map.insert(key.to_owned(), value.to_owned());

        let contents = serde_json::to_string_pretty(&map)
            .map_err(|e| PreferenceError::Storage(format!("failed to encode preferences: {e}")))?;
        fs::write(&self.path, contents)
            .map_err(|e| PreferenceError::Storage(format!("failed to write preference file: {e}")))
    }
}
