/// Key-value storage backing the exchange-wallet cache.
///
/// `MemoryStore` keeps everything in a map; `JsonFileStore` mirrors the map into a JSON
/// object on disk and replaces the whole file on every flush.
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::errors::WatchError;

/// Minimal store interface: read a key, write a key, persist everything written so far.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<bool>;
    fn set(&mut self, key: String, value: bool);
    fn flush(&mut self) -> Result<(), WatchError>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store. `flush` is a no-op.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: String, value: bool) {
        self.entries.insert(key, value);
    }

    fn flush(&mut self) -> Result<(), WatchError> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// File-backed store holding a flat `{ "<key>": bool }` JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    entries: HashMap<String, bool>,
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing entries if the file is present.
    ///
    /// A missing or malformed file yields an empty store, so a damaged cache only costs a
    /// re-lookup of each address. A file that cannot be read at all is a `Storage` error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("No cache file at {}, starting empty", path.display());
            return Ok(Self {
                entries: HashMap::new(),
                path,
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let entries = if contents.trim().is_empty() {
            HashMap::new()
        } else {
            match serde_json::from_str::<HashMap<String, bool>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Malformed cache file {}, starting empty: {}", path.display(), e);
                    HashMap::new()
                }
            }
        };
        debug!("Loaded {} cached entries from {}", entries.len(), path.display());

        Ok(Self { entries, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the next snapshot is written to before it replaces `path`.
    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: String, value: bool) {
        self.entries.insert(key, value);
    }

    fn flush(&mut self) -> Result<(), WatchError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // BTreeMap keeps the file stable between rewrites
        let sorted: std::collections::BTreeMap<&String, &bool> = self.entries.iter().collect();
        let json = serde_json::to_string_pretty(&sorted)
            .map_err(|e| WatchError::Storage(e.to_string()))?;

        // the live file is only ever replaced whole, never truncated in place
        let staging = self.staging_path();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)?;
        let mut writer = std::io::BufWriter::new(file);
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        std::fs::rename(&staging, &self.path)?;
        debug!("Saved {} cached entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
