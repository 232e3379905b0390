use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SessionError;

/// Key-value backend for local session state.
///
/// Values are opaque strings; the session manager owns their encoding.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;

    /// Write several keys as one unit. On failure every key already
    /// written is restored to its previous value.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), SessionError> {
        let previous: Vec<(&str, Option<String>)> = entries.iter().map(|(key, _)| (*key, self.get(key))).collect();

        for (applied, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                for (key, old) in previous.iter().take(applied).rev() {
                    let restored = match old {
                        Some(old) => self.set(key, old),
                        None => self.remove(key),
                    };
                    if let Err(e) = restored {
                        tracing::warn!("Failed to restore {} after a partial write: {}", key, e);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove keys in order, stopping at the first failure. Callers list
    /// the key that gates the others first.
    fn remove_many(&mut self, keys: &[&str]) -> Result<(), SessionError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// In-process store, used by tests and by embedders that persist elsewhere
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value directly, bypassing the session manager
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Stores all keys in a single `session.json` file.
///
/// The file is read once on open; reads are served from memory and every
/// change is written through before it becomes visible.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn open(dir: &Path) -> Result<Self, SessionError> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let path = dir.join(Self::FILE_NAME);
        let values = load(&path);
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `next`, then adopt it. A failed write leaves memory untouched.
    fn commit(&mut self, next: HashMap<String, String>) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, content)?;
        self.values = next;
        Ok(())
    }
}

fn load(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    // A corrupt file reads as an empty session
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("Ignoring corrupt session file {}: {}", path.display(), e);
        HashMap::new()
    })
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.remove_many(&[key])
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), SessionError> {
        let mut next = self.values.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.commit(next)
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), SessionError> {
        if !keys.iter().any(|key| self.values.contains_key(*key)) {
            return Ok(());
        }
        let mut next = self.values.clone();
        for key in keys {
            next.remove(*key);
        }
        self.commit(next)
    }
}
