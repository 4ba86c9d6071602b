//! Partitioned key-value persistence.
//!
//! Each partition is a flat map of string keys to opaque string values,
//! persisted as one JSON document (`<dir>/<name>.bin`). Reads are served from
//! memory; writes either commit to disk before returning (`auto_save`) or stay
//! dirty until [`KvStore::save`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("value for key {key:?} could not be (de)serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Options for opening a partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub auto_save: bool,
}

impl StoreOptions {
    #[must_use]
    pub fn auto_save() -> Self {
        Self { auto_save: true }
    }
}

/// Result of a read: found, absent, or failed.
///
/// Keeps "not found" distinguishable from "could not read".
#[derive(Debug)]
pub enum Lookup<T = String> {
    Found(T),
    NotFound,
    Failed(StoreError),
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Collapses to `Option`, logging a failure and treating it as absent.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
            Self::Failed(e) => {
                tracing::error!(error = %e, "Store read failed");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns the underlying [`StoreError`] for `Failed`.
    pub fn into_result(self) -> Result<Option<T>, StoreError> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Failed(e) => Err(e),
        }
    }
}

#[derive(Default)]
struct Entries {
    map: IndexMap<String, String>,
    // bumped on every mutation, compared against `saved` to skip no-op saves
    version: u64,
    saved: u64,
}

/// One store partition.
pub struct KvStore {
    path: Option<PathBuf>,
    options: StoreOptions,
    entries: Mutex<Entries>,
    // serializes snapshot, write and rename of the partition file
    save_lock: tokio::sync::Mutex<()>,
}

impl KvStore {
    /// Open a partition file. A missing file is an empty partition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Corrupt`] if it is not a JSON object of strings.
    pub async fn load(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        let path = path.into();
        let map = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => IndexMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), keys = map.len(), "Store loaded");

        Ok(Self {
            path: Some(path),
            options,
            entries: Mutex::new(Entries {
                map,
                ..Entries::default()
            }),
            save_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// A partition with no backing file. `save` is a no-op.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            options: StoreOptions::default(),
            entries: Mutex::new(Entries::default()),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Lookup {
        match self.entries.lock().map.get(key) {
            Some(value) => Lookup::Found(value.clone()),
            None => Lookup::NotFound,
        }
    }

    /// Read a value stored with [`set_json`](Self::set_json).
    #[must_use]
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.get(key) {
            Lookup::Found(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Lookup::Found(value),
                Err(source) => Lookup::Failed(StoreError::Serialize {
                    key: key.to_string(),
                    source,
                }),
            },
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed(e) => Lookup::Failed(e),
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `auto_save` is on and the commit fails.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.lock();
            entries.map.insert(key.to_string(), value.into());
            entries.version += 1;
        }
        self.commit("set", key).await
    }

    /// Store `value` as its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if `value` cannot be serialized, or
    /// any error from [`set`](Self::set).
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set(key, raw).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `auto_save` is on and the commit fails.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.lock();
            if entries.map.shift_remove(key).is_some() {
                entries.version += 1;
            }
        }
        self.commit("remove", key).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `auto_save` is on and the commit fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.lock();
            entries.map.clear();
            entries.version += 1;
        }
        self.commit("clear", "*").await
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if there are changes not yet written to disk.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let entries = self.entries.lock();
        self.path.is_some() && entries.version != entries.saved
    }

    /// Flush pending changes to disk.
    ///
    /// The document is written to a sibling temp file and renamed into place.
    /// Saves run one at a time, each writing the newest in-memory state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _saving = self.save_lock.lock().await;

        let (raw, version) = {
            let entries = self.entries.lock();
            if entries.version == entries.saved {
                return Ok(());
            }
            let raw = serde_json::to_string_pretty(&entries.map).map_err(|source| {
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?;
            (raw, entries.version)
        };

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        let mut entries = self.entries.lock();
        entries.saved = entries.saved.max(version);
        Ok(())
    }

    async fn commit(&self, operation: &'static str, key: &str) -> Result<(), StoreError> {
        if !self.options.auto_save {
            return Ok(());
        }
        self.save().await.inspect_err(|e| {
            tracing::error!(error = %e, operation, key, "Store commit failed");
        })
    }
}

/// Directory holding one file per named partition.
#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
}

impl StoreDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `users` -> `<root>/users.bin`
    #[must_use]
    pub fn partition_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.bin"))
    }

    /// # Errors
    ///
    /// See [`KvStore::load`].
    pub async fn open(&self, name: &str, options: StoreOptions) -> Result<KvStore, StoreError> {
        KvStore::load(self.partition_path(name), options).await
    }
}
