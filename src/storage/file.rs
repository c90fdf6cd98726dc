use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::KeyValueStore;
use crate::error::PersistenceError;

/// Key-value store keeping one `<key>.json` file per key in a directory.
///
/// Another process writing the same directory is detected by comparing a
/// fingerprint of each file against what this instance last read or wrote.
pub struct FileStorage {
    dir: PathBuf,
    seen: BTreeMap<String, Option<u64>>,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            seen: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(PersistenceError::backend(key, "invalid storage key"));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::backend(key, e)),
        }
    }
}

fn fingerprint(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl KeyValueStore for FileStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self.read(key)?;
        self.seen
            .insert(key.to_string(), value.as_deref().map(fingerprint));
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| PersistenceError::backend(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| PersistenceError::backend(key, e))?;
        self.seen.insert(key.to_string(), Some(fingerprint(value)));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PersistenceError::backend(key, e)),
        }
        self.seen.insert(key.to_string(), None);
        Ok(())
    }

    fn poll_external_changes(&mut self) -> Result<Vec<String>, PersistenceError> {
        let mut changed = Vec::new();
        let keys: Vec<String> = self.seen.keys().cloned().collect();
        for key in keys {
            // An unreadable key keeps its old fingerprint and is retried on
            // the next poll.
            let current = match self.read(&key) {
                Ok(value) => value.as_deref().map(fingerprint),
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to read key while polling");
                    continue;
                }
            };
            if self.seen.get(&key) != Some(&current) {
                self.seen.insert(key.clone(), current);
                changed.push(key);
            }
        }
        Ok(changed)
    }
}
