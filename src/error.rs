//! Error types for the cache hierarchy

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while operating a cache chain
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Chain Errors
    // =========================================================================
    /// Key absent from every cache level and the terminal store
    #[error("Cache miss: key not present in any level or the backing store")]
    CacheMiss,

    /// Operation needs a terminal store but the chain ends in memory
    #[error("No backing store: the chain has no terminal store endpoint")]
    NoBStore,

    /// Durable data operation attempted while the store is closed
    #[error("Backing store is closed")]
    BStoreClosed,

    /// Capacity below the minimum of one entry
    #[error("Invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity { capacity: usize },

    /// Level index outside the chain
    #[error("Level {index} out of range for a chain of {levels} levels")]
    LevelOutOfRange { index: usize, levels: usize },

    /// A chain needs at least one cache level
    #[error("A cache chain needs at least one cache level")]
    EmptyChain,

    // =========================================================================
    // Durable Store Errors
    // =========================================================================
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store contents could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for the miss signal, as opposed to a failure
    pub fn is_miss(&self) -> bool {
        matches!(self, Error::CacheMiss)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
