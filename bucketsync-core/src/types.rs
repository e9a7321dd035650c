//! Domain types for bucketsync.
//!
//! Local paths use `PathBuf`; keys shared between the two sides of a sync use
//! [`PathKey`], which is always `/`-separated regardless of platform.

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A relative, forward-slash-separated key identifying one file on either side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathKey(pub String);

impl PathKey {
    /// Build a key from a path relative to the sync root.
    ///
    /// `.` components are dropped; `..`, roots and drive prefixes are rejected.
    pub fn from_relative_path(path: &Path) -> Result<Self, KeyError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| KeyError::NonUtf8(path.to_string_lossy().into_owned()))?;
                    segments.push(part);
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(KeyError::InvalidSegment(path.display().to_string()))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(KeyError::Absolute(path.display().to_string()))
                }
            }
        }
        if segments.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(segments.join("/")))
    }

    /// Resolve the key below `root`.
    ///
    /// Store keys are arbitrary strings, so every segment is checked before it
    /// touches the filesystem: the result never escapes `root`.
    pub fn to_local_path(&self, root: &Path) -> Result<PathBuf, KeyError> {
        if self.0.is_empty() {
            return Err(KeyError::Empty);
        }
        if self.0.starts_with('/') || self.0.starts_with('\\') {
            return Err(KeyError::Absolute(self.0.clone()));
        }
        let mut path = root.to_path_buf();
        for segment in self.0.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(KeyError::InvalidSegment(self.0.clone()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PathKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Hex-encoded content digest, or a store content tag normalised to the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Normalise a store content tag by stripping wrapping `"` characters.
    pub fn from_tag(tag: &str) -> Self {
        Self(tag.trim_matches('"').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Mapping from path key to fingerprint for one side of a sync.
///
/// Sorted, so anything derived from it iterates deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    entries: BTreeMap<PathKey, Fingerprint>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the fingerprint previously stored for `key`.
    pub fn insert(&mut self, key: PathKey, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(key, fingerprint)
    }

    pub fn get(&self, key: &PathKey) -> Option<&Fingerprint> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PathKey, Fingerprint> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, PathKey, Fingerprint> {
        self.entries.keys()
    }
}

impl FromIterator<(PathKey, Fingerprint)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (PathKey, Fingerprint)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = (&'a PathKey, &'a Fingerprint);
    type IntoIter = btree_map::Iter<'a, PathKey, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Diff result
// ---------------------------------------------------------------------------

/// Partition of the union of keys from a source and a destination inventory.
///
/// A key appears in at most one of the three groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Missing from the destination, or present with a different fingerprint.
    pub to_transfer: BTreeSet<PathKey>,
    /// Present on both sides with equal fingerprints.
    pub unchanged: BTreeSet<PathKey>,
    /// Present only in the destination.
    pub destination_only: BTreeSet<PathKey>,
}

impl DiffResult {
    /// `true` when a run with deletion enabled would change nothing.
    pub fn is_noop(&self) -> bool {
        self.to_transfer.is_empty() && self.destination_only.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which side is the source of truth for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local directory is the source, the bucket is the destination.
    Upload,
    /// The bucket is the source, the local directory is the destination.
    Download,
}

impl SyncDirection {
    pub fn source_label(self) -> &'static str {
        match self {
            SyncDirection::Upload => "local",
            SyncDirection::Download => "remote",
        }
    }

    pub fn destination_label(self) -> &'static str {
        match self {
            SyncDirection::Upload => "remote",
            SyncDirection::Download => "local",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Upload => write!(f, "upload"),
            SyncDirection::Download => write!(f, "download"),
        }
    }
}

/// Continuation policy for the batch phases (transfer-all, delete-all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed key; later keys are not attempted.
    #[default]
    FailFast,
    /// Attempt every key, then report all failures together.
    CollectAll,
}

// ---------------------------------------------------------------------------
// Sync configuration
// ---------------------------------------------------------------------------

/// Everything one pipeline run needs to know, built once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Local directory root (source for uploads, destination for downloads).
    pub local_root: PathBuf,
    pub bucket: String,
    pub direction: SyncDirection,
    /// Delete destination-only entries after the transfer phase.
    pub delete_extraneous: bool,
    /// Compute and report the plan without touching either side.
    pub dry_run: bool,
    pub failure_policy: FailurePolicy,
}

impl SyncConfig {
    /// A fail-fast, non-deleting configuration.
    pub fn new(
        local_root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        direction: SyncDirection,
    ) -> Self {
        Self {
            local_root: local_root.into(),
            bucket: bucket.into(),
            direction,
            delete_extraneous: false,
            dry_run: false,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
