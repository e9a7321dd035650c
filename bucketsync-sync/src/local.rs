//! Local inventory: every regular file under a root, keyed by relative path.

use std::io;
use std::path::Path;

use walkdir::WalkDir;

use bucketsync_core::{fingerprint_file, Inventory, PathKey};

use crate::error::SyncError;

/// Walk `root` recursively and fingerprint every regular file.
///
/// Directories are traversed but not recorded. Symlinks are followed.
/// The first I/O failure aborts
/// the whole build; no partial inventory is returned.
pub fn build_local(root: &Path) -> Result<Inventory, SyncError> {
    let meta = std::fs::metadata(root).map_err(|e| traversal(root, e))?;
    if !meta.is_dir() {
        return Err(traversal(root, io::Error::other("not a directory")));
    }

    let mut inventory = Inventory::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .min_depth(1);
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            traversal(&path, io::Error::from(e))
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            tracing::debug!("skipping non-regular file {}", entry.path().display());
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = PathKey::from_relative_path(relative).map_err(|source| SyncError::InvalidKey {
            path: entry.path().to_path_buf(),
            source,
        })?;
        let fingerprint = fingerprint_file(entry.path()).map_err(|e| traversal(entry.path(), e))?;
        tracing::debug!("local {key} {fingerprint}");
        inventory.insert(key, fingerprint);
    }
    Ok(inventory)
}

fn traversal(path: &Path, source: io::Error) -> SyncError {
    SyncError::Traversal {
        path: path.to_path_buf(),
        source,
    }
}
