//! Optional YAML profile with store defaults.
//!
//! # Storage layout
//!
//! ```text
//! ~/.bucketsync/
//!   config.yaml   (hand-edited; may hold credentials)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! The profile only supplies defaults. Callers layer CLI flags and
//! environment variables on top; see `bucketsync-store` for resolution.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ConfigError};

/// Region used when neither flags, environment nor profile name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Contents of `~/.bucketsync/config.yaml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub region: Option<String>,
    /// Custom S3-compatible endpoint, e.g. `http://localhost:4566`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Force `endpoint/bucket/key` URLs instead of `bucket.endpoint/key`.
    #[serde(default)]
    pub path_style: Option<bool>,
}

/// `<home>/.bucketsync/config.yaml`. Pure, no I/O.
pub fn profile_path_at(home: &Path) -> PathBuf {
    home.join(".bucketsync").join("config.yaml")
}

/// Load the profile, returning defaults if the file does not exist.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Profile, ConfigError> {
    let path = profile_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Profile::default()),
        Err(e) => return Err(io_err(&path, e)),
    };
    if contents.trim().is_empty() {
        return Ok(Profile::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Profile, ConfigError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
