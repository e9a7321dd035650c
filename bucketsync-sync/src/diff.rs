//! Diff engine: classify keys of a source and destination inventory.
//!
//! Pure and synchronous. Equality of fingerprint strings is the only signal;
//! sizes and timestamps are never consulted, so a byte-identical file is
//! unchanged however old it is, and a byte-different file is transferred
//! whichever side is newer.
//!
//! Both inventories are fully materialised before diffing. A streaming
//! merge-join over sorted listings would bound memory for very large trees;
//! that is not done here.

use bucketsync_core::{DiffResult, Inventory};

/// Partition the union of keys of `source` and `dest`.
///
/// - in `source`, absent from `dest` or with a different value → `to_transfer`
/// - in both with equal values → `unchanged`
/// - only in `dest` → `destination_only`
pub fn diff(source: &Inventory, dest: &Inventory) -> DiffResult {
    let mut result = DiffResult::default();

    for (key, fingerprint) in source {
        match dest.get(key) {
            Some(existing) if existing == fingerprint => {
                result.unchanged.insert(key.clone());
            }
            _ => {
                result.to_transfer.insert(key.clone());
            }
        }
    }

    for key in dest.keys() {
        if !source.contains(key) {
            result.destination_only.insert(key.clone());
        }
    }

    result
}
