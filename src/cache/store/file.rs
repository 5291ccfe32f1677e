//! File-backed durable store
//!
//! Contents are held in memory while open and persisted as a JSON record list
//! on `close` and `flush`. Writes go to a sibling temp file that is renamed
//! over the target, so a crash mid-write leaves the previous file intact.

use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::DurableStore;
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// On-disk layout
#[derive(Serialize, Deserialize)]
struct StoreFile<K, V> {
    records: Vec<Record<K, V>>,
}

#[derive(Serialize, Deserialize)]
struct Record<K, V> {
    key: K,
    value: V,
}

/// Durable store persisted to a single JSON file
#[derive(Debug)]
pub struct FileStore<K, V> {
    path: PathBuf,
    /// Loaded contents; `None` while closed
    data: Option<HashMap<K, V>>,
}

impl<K, V> FileStore<K, V>
where
    K: Hash + Eq + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Create a closed store at `path`. The file is created on first close.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: None,
        }
    }

    /// Create a closed store from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| Error::Config("file store requires a path".to_string()))?;
        Ok(Self::new(path.clone()))
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist current contents without closing
    pub fn flush(&self) -> Result<()> {
        let data = self.data.as_ref().ok_or(Error::BStoreClosed)?;
        self.persist(data)
    }

    fn load(&self) -> Result<HashMap<K, V>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&self.path)?;
        let file: StoreFile<K, V> = serde_json::from_slice(&bytes)?;
        Ok(file
            .records
            .into_iter()
            .map(|record| (record.key, record.value))
            .collect())
    }

    fn persist(&self, data: &HashMap<K, V>) -> Result<()> {
        let file = StoreFile {
            records: data
                .iter()
                .map(|(key, value)| Record { key, value })
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), records = data.len(), "Persisted file store");
        Ok(())
    }

    fn data(&self) -> Result<&HashMap<K, V>> {
        self.data.as_ref().ok_or(Error::BStoreClosed)
    }

    fn data_mut(&mut self) -> Result<&mut HashMap<K, V>> {
        self.data.as_mut().ok_or(Error::BStoreClosed)
    }
}

impl<K, V> DurableStore<K, V> for FileStore<K, V>
where
    K: Hash + Eq + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    fn open(&mut self) -> Result<()> {
        if self.data.is_none() {
            let data = self.load()?;
            info!(path = %self.path.display(), records = data.len(), "Opened file store");
            self.data = Some(data);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(data) = self.data.as_ref() {
            // Stay open if persisting fails so nothing is lost
            self.persist(data)?;
            self.data = None;
            info!(path = %self.path.display(), "Closed file store");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.data.is_some()
    }

    fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.data()?.get(key).cloned())
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        self.data_mut()?.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &K) -> Result<Option<V>> {
        Ok(self.data_mut()?.remove(key))
    }

    fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.data()?.contains_key(key))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data()?.len())
    }

    fn keys(&self) -> Result<Vec<K>> {
        Ok(self.data()?.keys().cloned().collect())
    }
}
