//! Per-key outcomes and the summary of a finished run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bucketsync_core::{PathKey, SyncDirection};

/// What happened to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Copied from source to destination.
    Transferred,
    /// Equal on both sides; skipped.
    Unchanged,
    /// Removed from the destination.
    Deleted,
    /// `--dry-run`: would have been copied.
    WouldTransfer,
    /// `--dry-run`: would have been removed.
    WouldDelete,
}

/// Outcome of a single key, emitted as it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOutcome {
    pub key: PathKey,
    pub action: Action,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub bucket: String,
    pub local_root: PathBuf,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub outcomes: Vec<KeyOutcome>,
}

impl SyncReport {
    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    pub fn transferred(&self) -> usize {
        self.count(Action::Transferred)
    }

    pub fn unchanged(&self) -> usize {
        self.count(Action::Unchanged)
    }

    pub fn deleted(&self) -> usize {
        self.count(Action::Deleted)
    }

    /// Keys with the given action, in the order they were processed.
    pub fn keys_with(&self, action: Action) -> Vec<&PathKey> {
        self.outcomes
            .iter()
            .filter(|o| o.action == action)
            .map(|o| &o.key)
            .collect()
    }

    /// `true` when nothing was, or in a dry run would be, changed.
    pub fn is_noop(&self) -> bool {
        self.outcomes.iter().all(|o| o.action == Action::Unchanged)
    }
}
