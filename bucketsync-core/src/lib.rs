//! bucketsync core library: domain types, fingerprints, profile config and errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, inventories, diff result, sync configuration
//! - [`fingerprint`]: MD5 content fingerprints comparable with store ETags
//! - [`config`]: optional `~/.bucketsync/config.yaml` profile
//! - [`error`]: [`ConfigError`], [`KeyError`]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::Profile;
pub use error::{ConfigError, KeyError};
pub use fingerprint::{fingerprint_bytes, fingerprint_file, fingerprint_reader};
pub use types::{
    DiffResult, FailurePolicy, Fingerprint, Inventory, PathKey, SyncConfig, SyncDirection,
};
