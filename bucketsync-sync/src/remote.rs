//! Remote inventory: every object in a bucket, keyed by object key.

use bucketsync_core::{Fingerprint, Inventory, PathKey};
use bucketsync_store::{ObjectStore, StoreError};

use crate::error::SyncError;

/// List the whole bucket, following continuation tokens until exhausted.
///
/// Content tags are normalised by stripping wrapping quotes. Keys ending in
/// `/` are directory placeholder objects and are left out. A failure on any
/// page aborts the build.
pub fn build_remote(store: &dyn ObjectStore, bucket: &str) -> Result<Inventory, SyncError> {
    let connectivity = |source: StoreError| SyncError::Connectivity {
        bucket: bucket.to_string(),
        source,
    };

    let mut inventory = Inventory::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = store
            .list_page(bucket, continuation.as_deref())
            .map_err(connectivity)?;
        pages += 1;
        tracing::debug!("listing page {pages}: {} object(s)", page.objects.len());

        for object in page.objects {
            if object.key.ends_with('/') {
                tracing::debug!("skipping directory placeholder {}", object.key);
                continue;
            }
            inventory.insert(PathKey::from(object.key), Fingerprint::from_tag(&object.etag));
        }

        match page.next_continuation {
            Some(next) if continuation.as_deref() == Some(next.as_str()) => {
                return Err(connectivity(StoreError::Protocol(format!(
                    "listing repeated continuation token '{next}'"
                ))));
            }
            Some(next) => continuation = Some(next),
            None => break,
        }
    }
    Ok(inventory)
}
