//! Chain configuration
//!
//! Describes the shape of a chain: one capacity per cache level, top first,
//! and an optional terminal store. Loaded from YAML:
//!
//! ```yaml
//! levels: [1, 2]
//! store:
//!   capacity: 3
//!   path: /var/lib/cachechain/store.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Terminal store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of keys the store may hold
    pub capacity: usize,
    /// Backing file for a [`FileStore`](crate::cache::FileStore)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Cache level capacities, top level first
    pub levels: Vec<usize>,
    /// Terminal store; `None` builds a purely in-memory chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            levels: vec![crate::cache::DEFAULT_LEVEL_CAPACITY],
            store: None,
        }
    }
}

impl ChainConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject empty chains and zero capacities
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(Error::Config("at least one cache level is required".to_string()));
        }
        if let Some(index) = self.levels.iter().position(|&capacity| capacity == 0) {
            return Err(Error::Config(format!(
                "level {} capacity must be at least 1",
                index
            )));
        }
        if let Some(store) = &self.store {
            if store.capacity == 0 {
                return Err(Error::Config(
                    "store capacity must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_durable_chain() {
        let config = ChainConfig::from_yaml_str(
            "levels: [1, 2]\nstore:\n  capacity: 3\n  path: /tmp/store.json\n",
        )
        .unwrap();

        assert_eq!(config.levels, vec![1, 2]);
        let store = config.store.unwrap();
        assert_eq!(store.capacity, 3);
        assert_eq!(store.path, Some(PathBuf::from("/tmp/store.json")));
    }

    #[test]
    fn test_parse_in_memory_chain() {
        let config = ChainConfig::from_yaml_str("levels: [4]").unwrap();
        assert!(config.store.is_none());
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            ChainConfig::from_yaml_str("levels: []"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ChainConfig::from_yaml_str("levels: [2, 0]"),
            Err(Error::Config(msg)) if msg.contains("level 1")
        ));
        assert!(matches!(
            ChainConfig::from_yaml_str("levels: [2]\nstore:\n  capacity: 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ChainConfig::from_yaml_str("levels: [not-a-number]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ChainConfig {
            levels: vec![1, 2],
            store: Some(StoreConfig {
                capacity: 3,
                path: None,
            }),
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ChainConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.yaml");
        fs::write(&path, "levels: [8, 16]\n").unwrap();

        let config = ChainConfig::from_file(&path).unwrap();
        assert_eq!(config.levels, vec![8, 16]);
    }

    #[test]
    fn test_default_is_valid() {
        assert!(ChainConfig::default().validate().is_ok());
    }
}
