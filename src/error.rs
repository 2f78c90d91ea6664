//! Error types for the load-test engine
//!
//! Each layer owns its error enum; this module defines the configuration
//! errors and re-exports the rest so callers have one place to look.
//!
//! | Failure                          | Type                |
//! |----------------------------------|---------------------|
//! | Invalid or missing plan fields   | [`ConfigError`]     |
//! | Open attempt or session failure  | [`TransportError`]  |
//! | Worker fault                     | [`WorkerError`]     |
//! | Worker could not be started      | [`LaunchError`]     |
//! | Broken worker event stream       | [`WireError`]       |

use std::path::PathBuf;
use thiserror::Error;

pub use crate::driver::DriverError;
pub use crate::events::WireError;
pub use crate::transport::TransportError;
pub use crate::worker::{LaunchError, WorkerError};

/// Configuration problems, all fatal before any worker starts
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("a room name is required (--room or `room` in the config file)")]
    MissingTarget,

    #[error("invalid endpoint '{endpoint}': expected a ws:// or wss:// URL")]
    InvalidEndpoint { endpoint: String },

    #[error("unknown script '{name}' (available: {available})")]
    UnknownScript { name: String, available: String },

    #[error("report interval must be greater than zero")]
    ZeroReportInterval,

    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert!(ConfigError::MissingTarget.to_string().contains("--room"));
        assert_eq!(
            ConfigError::InvalidEndpoint {
                endpoint: "http://x".into()
            }
            .to_string(),
            "invalid endpoint 'http://x': expected a ws:// or wss:// URL"
        );
        assert_eq!(
            ConfigError::UnknownScript {
                name: "x".into(),
                available: "idle, chatty".into()
            }
            .to_string(),
            "unknown script 'x' (available: idle, chatty)"
        );
    }

    #[test]
    fn test_read_error_names_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/tmp/missing.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
