//! Error types for bucketsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading the profile file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.bucketsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// A filesystem path that cannot be expressed as a [`crate::PathKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("path key is empty")]
    Empty,

    #[error("path key must be relative: {0}")]
    Absolute(String),

    /// A segment that is empty, `.` or `..` and would not map 1:1 onto a file.
    #[error("path key has an invalid segment: {0}")]
    InvalidSegment(String),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
