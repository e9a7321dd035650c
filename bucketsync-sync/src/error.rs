//! Error types for bucketsync-sync.
//!
//! One variant per failure class of a run. Every variant is fatal to the run
//! that produced it; nothing already applied is rolled back.

use std::path::PathBuf;

use thiserror::Error;

use bucketsync_core::{KeyError, PathKey};
use bucketsync_store::StoreError;

/// Why a single transfer or deletion failed.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// All errors that can end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store cannot be reached, authenticated against, or the bucket is
    /// inaccessible. Raised before any transfer is attempted.
    #[error("cannot access bucket '{bucket}': {source}")]
    Connectivity {
        bucket: String,
        #[source]
        source: StoreError,
    },

    /// Walking the local tree failed.
    #[error("cannot read local tree at {path}: {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local file whose relative path cannot become a key.
    #[error("cannot derive a key for {path}: {source}")]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: KeyError,
    },

    #[error("transfer of '{key}' failed: {source}")]
    Transfer {
        key: PathKey,
        #[source]
        source: ActionError,
    },

    #[error("deletion of '{key}' failed: {source}")]
    Deletion {
        key: PathKey,
        #[source]
        source: ActionError,
    },

    /// Every per-key failure of a run that continued past errors.
    #[error("{} key(s) failed: {}", .failures.len(), preview(.failures))]
    Batch { failures: Vec<SyncError> },
}

fn preview(failures: &[SyncError]) -> String {
    const MAX: usize = 3;
    let mut shown: Vec<String> = failures.iter().take(MAX).map(ToString::to_string).collect();
    if failures.len() > MAX {
        shown.push(format!("... and {} more", failures.len() - MAX));
    }
    shown.join("; ")
}

/// Convenience constructor for [`ActionError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ActionError {
    ActionError::Io {
        path: path.into(),
        source,
    }
}
