//! Logging setup
//!
//! The library only emits `tracing` events. Binaries and tests that want to
//! see them install a subscriber with [`init_logging`].

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Parse a level name, case-insensitively
pub fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::Config(format!("unknown log level '{}'", other))),
    }
}

/// Install a global subscriber. `RUST_LOG` directives are honored on top of
/// `level`. Fails if a global subscriber is already set.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(parse_level(level)?.into());

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };
    installed.map_err(|e| Error::Config(format!("failed to install subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert!(matches!(parse_level("loud"), Err(Error::Config(_))));
    }

    #[test]
    fn test_second_init_fails() {
        // Another test may have installed one already; either way the
        // second call must report the conflict
        let _ = init_logging("info", false);
        assert!(matches!(init_logging("debug", true), Err(Error::Config(_))));
    }
}
