//! Reconciler: applies a diff result to the destination side.
//!
//! Two batch phases, transfer then deletion, each driven by a
//! [`FailurePolicy`]. Applied keys are never rolled back: a failure leaves
//! every earlier transfer or deletion in place.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::ErrorKind;

use bucketsync_core::{FailurePolicy, PathKey, SyncConfig, SyncDirection};
use bucketsync_store::ObjectStore;

use crate::error::{io_err, ActionError, SyncError};
use crate::report::{Action, KeyOutcome};
use crate::writer;

/// Applies transfers and deletions for one run.
pub struct Reconciler<'a> {
    config: &'a SyncConfig,
    store: &'a dyn ObjectStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a SyncConfig, store: &'a dyn ObjectStore) -> Self {
        Self { config, store }
    }

    // -----------------------------------------------------------------------
    // Single-key operations
    // -----------------------------------------------------------------------

    /// Copy one key from the source side to the destination side.
    pub fn transfer(&self, key: &PathKey) -> Result<(), SyncError> {
        let result = match self.config.direction {
            SyncDirection::Upload => self.upload(key),
            SyncDirection::Download => self.download(key),
        };
        result.map_err(|source| SyncError::Transfer {
            key: key.clone(),
            source,
        })
    }

    /// Remove one key from the destination side.
    pub fn delete(&self, key: &PathKey) -> Result<(), SyncError> {
        let result = match self.config.direction {
            SyncDirection::Upload => self.delete_remote(key),
            SyncDirection::Download => self.delete_local(key),
        };
        result.map_err(|source| SyncError::Deletion {
            key: key.clone(),
            source,
        })
    }

    fn upload(&self, key: &PathKey) -> Result<(), ActionError> {
        let path = key.to_local_path(&self.config.local_root)?;
        let mut file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let length = file.metadata().map_err(|e| io_err(&path, e))?.len();
        let tag = self
            .store
            .put_object(&self.config.bucket, key.as_str(), &mut file, length)?;
        tracing::debug!("store tagged {key} as {tag}");
        tracing::info!("uploaded {key} to s3://{}/{key}", self.config.bucket);
        Ok(())
    }

    fn download(&self, key: &PathKey) -> Result<(), ActionError> {
        let path = key.to_local_path(&self.config.local_root)?;
        let body = self.store.get_object(&self.config.bucket, key.as_str())?;
        writer::write_atomic(&path, body)?;
        tracing::info!("downloaded s3://{}/{key} to {}", self.config.bucket, path.display());
        Ok(())
    }

    fn delete_remote(&self, key: &PathKey) -> Result<(), ActionError> {
        self.store.delete_object(&self.config.bucket, key.as_str())?;
        tracing::info!("deleted s3://{}/{key}", self.config.bucket);
        Ok(())
    }

    fn delete_local(&self, key: &PathKey) -> Result<(), ActionError> {
        let path = key.to_local_path(&self.config.local_root)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} already gone", path.display());
            }
            Err(e) => return Err(io_err(&path, e)),
        }
        tracing::info!("deleted local file {}", path.display());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Batch phases
    // -----------------------------------------------------------------------

    /// Transfer every key in `keys`.
    ///
    /// `FailFast` returns the first error; `CollectAll` attempts every key and
    /// returns the failures.
    pub fn transfer_all(
        &self,
        keys: &BTreeSet<PathKey>,
        policy: FailurePolicy,
        on_outcome: &mut dyn FnMut(&KeyOutcome),
    ) -> Result<Vec<SyncError>, SyncError> {
        apply_all(keys, policy, Action::Transferred, |k| self.transfer(k), on_outcome)
    }

    /// Delete every key in `keys`, with the same policy semantics as
    /// [`Reconciler::transfer_all`].
    pub fn delete_all(
        &self,
        keys: &BTreeSet<PathKey>,
        policy: FailurePolicy,
        on_outcome: &mut dyn FnMut(&KeyOutcome),
    ) -> Result<Vec<SyncError>, SyncError> {
        apply_all(keys, policy, Action::Deleted, |k| self.delete(k), on_outcome)
    }
}

fn apply_all(
    keys: &BTreeSet<PathKey>,
    policy: FailurePolicy,
    action: Action,
    op: impl Fn(&PathKey) -> Result<(), SyncError>,
    on_outcome: &mut dyn FnMut(&KeyOutcome),
) -> Result<Vec<SyncError>, SyncError> {
    let mut failures = Vec::new();
    for key in keys {
        match op(key) {
            Ok(()) => on_outcome(&KeyOutcome {
                key: key.clone(),
                action,
            }),
            Err(err) => match policy {
                FailurePolicy::FailFast => return Err(err),
                FailurePolicy::CollectAll => {
                    tracing::warn!("{err}");
                    failures.push(err);
                }
            },
        }
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketsync_store::{Fault, MemoryStore, Operation};
    use std::fs;
    use tempfile::TempDir;

    fn keys(items: &[&str]) -> BTreeSet<PathKey> {
        items.iter().map(|k| PathKey::from(*k)).collect()
    }

    fn collect(outcomes: &mut Vec<KeyOutcome>) -> impl FnMut(&KeyOutcome) + '_ {
        move |o: &KeyOutcome| outcomes.push(o.clone())
    }

    #[test]
    fn upload_puts_file_bytes_under_key() {
        let local = TempDir::new().unwrap();
        fs::create_dir_all(local.path().join("mvs")).unwrap();
        fs::write(local.path().join("mvs").join("i.json"), "{}").unwrap();
        let store = MemoryStore::new().with_bucket("b");
        let config = SyncConfig::new(local.path(), "b", SyncDirection::Upload);

        Reconciler::new(&config, &store)
            .transfer(&PathKey::from("mvs/i.json"))
            .unwrap();
        assert_eq!(store.object("b", "mvs/i.json").unwrap(), b"{}");
    }

    #[test]
    fn upload_streams_large_file_with_matching_tag() {
        let local = TempDir::new().unwrap();
        let body: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        fs::write(local.path().join("big.bin"), &body).unwrap();
        let store = MemoryStore::new().with_bucket("b");
        let config = SyncConfig::new(local.path(), "b", SyncDirection::Upload);

        Reconciler::new(&config, &store)
            .transfer(&PathKey::from("big.bin"))
            .unwrap();
        assert_eq!(store.object("b", "big.bin").unwrap(), body);
        let listed = store.list_page("b", None).unwrap();
        assert_eq!(
            listed.objects[0].etag,
            format!("\"{}\"", bucketsync_core::fingerprint_bytes(&body))
        );
    }

    #[test]
    fn download_writes_file_and_creates_parents() {
        let local = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("b", "sub/y.json", "2");
        let config = SyncConfig::new(local.path(), "b", SyncDirection::Download);

        Reconciler::new(&config, &store)
            .transfer(&PathKey::from("sub/y.json"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(local.path().join("sub").join("y.json")).unwrap(),
            "2"
        );
    }

    #[test]
    fn download_of_escaping_key_is_refused() {
        let local = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("b", "../evil", "x");
        let config = SyncConfig::new(local.path().join("root"), "b", SyncDirection::Download);

        let err = Reconciler::new(&config, &store)
            .transfer(&PathKey::from("../evil"))
            .unwrap_err();
        assert!(
            matches!(err, SyncError::Transfer { source: ActionError::Key(_), .. }),
            "got: {err}"
        );
        assert!(!local.path().join("evil").exists());
        assert!(store.operations().is_empty(), "nothing should be fetched");
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let local = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(local.path().join(name), name).unwrap();
        }
        let store = MemoryStore::new().with_bucket("bkt");
        store.fail_on(Fault::Put("b".into()));
        let config = SyncConfig::new(local.path(), "bkt", SyncDirection::Upload);

        let mut outcomes = Vec::new();
        let err = Reconciler::new(&config, &store)
            .transfer_all(
                &keys(&["a", "b", "c"]),
                FailurePolicy::FailFast,
                &mut collect(&mut outcomes),
            )
            .unwrap_err();

        assert!(matches!(err, SyncError::Transfer { ref key, .. } if key.as_str() == "b"));
        assert_eq!(store.keys("bkt"), vec!["a"], "earlier transfer stays, later is skipped");
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn collect_all_attempts_every_key() {
        let local = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(local.path().join(name), name).unwrap();
        }
        let store = MemoryStore::new().with_bucket("bkt");
        store.fail_on(Fault::Put("b".into()));
        let config = SyncConfig::new(local.path(), "bkt", SyncDirection::Upload);

        let mut outcomes = Vec::new();
        let failures = Reconciler::new(&config, &store)
            .transfer_all(
                &keys(&["a", "b", "c"]),
                FailurePolicy::CollectAll,
                &mut collect(&mut outcomes),
            )
            .unwrap();

        assert_eq!(failures.len(), 1);
        assert_eq!(store.keys("bkt"), vec!["a", "c"]);
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn delete_local_removes_only_named_file() {
        let local = TempDir::new().unwrap();
        fs::write(local.path().join("extra.json"), "1").unwrap();
        fs::write(local.path().join("keep.json"), "2").unwrap();
        let store = MemoryStore::new().with_bucket("b");
        let config = SyncConfig::new(local.path(), "b", SyncDirection::Download);

        let mut outcomes = Vec::new();
        Reconciler::new(&config, &store)
            .delete_all(
                &keys(&["extra.json"]),
                FailurePolicy::FailFast,
                &mut collect(&mut outcomes),
            )
            .unwrap();

        assert!(!local.path().join("extra.json").exists());
        assert!(local.path().join("keep.json").exists());
        assert_eq!(outcomes[0].action, Action::Deleted);
    }

    #[test]
    fn delete_remote_failure_is_deletion_error() {
        let local = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("b", "x", "1");
        store.insert("b", "y", "2");
        store.fail_on(Fault::Delete("x".into()));
        let config = SyncConfig::new(local.path(), "b", SyncDirection::Upload);

        let mut outcomes = Vec::new();
        let err = Reconciler::new(&config, &store)
            .delete_all(
                &keys(&["x", "y"]),
                FailurePolicy::FailFast,
                &mut collect(&mut outcomes),
            )
            .unwrap_err();

        assert!(matches!(err, SyncError::Deletion { .. }), "got: {err}");
        assert_eq!(store.keys("b"), vec!["x", "y"], "y must not be attempted");
        assert!(!store
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::Delete { key, .. } if key == "y")));
    }
}
