//! Sync pipeline entrypoint used by the CLI.
//!
//! `BuildSource → BuildDestination → Diff → Transfer → (Delete?) → Done`.
//! Any stage may end the run with an error. Nothing is retried or resumed;
//! re-running from scratch is the recovery path, and because the diff is
//! content-based a re-run skips everything already reconciled.

use std::fmt;
use std::time::Instant;

use chrono::Utc;

use bucketsync_core::{Inventory, SyncConfig, SyncDirection};
use bucketsync_store::{ObjectStore, StoreError};

use crate::diff::diff;
use crate::error::SyncError;
use crate::local::build_local;
use crate::reconcile::Reconciler;
use crate::remote::build_remote;
use crate::report::{Action, KeyOutcome, SyncReport};

/// Pipeline stage, used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildSource,
    BuildDestination,
    Diff,
    Transfer,
    Delete,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildSource => "build-source",
            Stage::BuildDestination => "build-destination",
            Stage::Diff => "diff",
            Stage::Transfer => "transfer",
            Stage::Delete => "delete",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Run the pipeline, discarding per-key progress.
pub fn run(config: &SyncConfig, store: &dyn ObjectStore) -> Result<SyncReport, SyncError> {
    run_with(config, store, &mut |_| {})
}

/// Run the pipeline, calling `on_outcome` for every key as soon as it is
/// settled. Outcomes already reported stay valid even if the run later fails.
///
/// Order of outcomes: unchanged keys first, then transfers, then deletions,
/// each group in key order.
pub fn run_with(
    config: &SyncConfig,
    store: &dyn ObjectStore,
    on_outcome: &mut dyn FnMut(&KeyOutcome),
) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    let clock = Instant::now();
    let mut outcomes: Vec<KeyOutcome> = Vec::new();
    let mut emit = |outcome: &KeyOutcome| {
        on_outcome(outcome);
        outcomes.push(outcome.clone());
    };

    tracing::info!(
        "{} from {} {} <-> s3://{}{}",
        config.direction,
        config.direction.source_label(),
        config.local_root.display(),
        config.bucket,
        if config.dry_run { " (dry run)" } else { "" }
    );

    let bucket_present = prepare_bucket(config, store)?;

    let (local, remote) = match config.direction {
        SyncDirection::Upload => {
            enter(Stage::BuildSource);
            let local = build_local(&config.local_root)?;
            enter(Stage::BuildDestination);
            let remote = remote_inventory(store, &config.bucket, bucket_present)?;
            (local, remote)
        }
        SyncDirection::Download => {
            enter(Stage::BuildSource);
            let remote = build_remote(store, &config.bucket)?;
            enter(Stage::BuildDestination);
            let local = local_destination(config)?;
            (local, remote)
        }
    };
    let (source, dest) = match config.direction {
        SyncDirection::Upload => (&local, &remote),
        SyncDirection::Download => (&remote, &local),
    };
    tracing::debug!(
        "{} source key(s), {} destination key(s)",
        source.len(),
        dest.len()
    );

    enter(Stage::Diff);
    let plan = diff(source, dest);
    tracing::info!(
        "{} to transfer, {} unchanged, {} only in {}",
        plan.to_transfer.len(),
        plan.unchanged.len(),
        plan.destination_only.len(),
        config.direction.destination_label()
    );

    for key in &plan.unchanged {
        emit(&KeyOutcome {
            key: key.clone(),
            action: Action::Unchanged,
        });
    }

    if config.dry_run {
        for key in &plan.to_transfer {
            emit(&KeyOutcome {
                key: key.clone(),
                action: Action::WouldTransfer,
            });
        }
        if config.delete_extraneous {
            for key in &plan.destination_only {
                emit(&KeyOutcome {
                    key: key.clone(),
                    action: Action::WouldDelete,
                });
            }
        }
    } else {
        let reconciler = Reconciler::new(config, store);
        let policy = config.failure_policy;

        enter(Stage::Transfer);
        let mut failures = reconciler.transfer_all(&plan.to_transfer, policy, &mut emit)?;

        if config.delete_extraneous {
            enter(Stage::Delete);
            failures.extend(reconciler.delete_all(&plan.destination_only, policy, &mut emit)?);
        } else if !plan.destination_only.is_empty() {
            tracing::debug!(
                "leaving {} destination-only key(s) in place",
                plan.destination_only.len()
            );
        }

        if !failures.is_empty() {
            return Err(SyncError::Batch { failures });
        }
    }

    enter(Stage::Done);
    Ok(SyncReport {
        direction: config.direction,
        bucket: config.bucket.clone(),
        local_root: config.local_root.clone(),
        dry_run: config.dry_run,
        started_at,
        duration_ms: clock.elapsed().as_millis(),
        outcomes,
    })
}

fn enter(stage: Stage) {
    tracing::debug!("stage: {stage}");
}

/// Make sure the bucket can be used for this run.
///
/// Uploads create a missing bucket; downloads require it. Returns whether
/// the bucket exists afterwards, which is only `false` in an upload dry run.
fn prepare_bucket(config: &SyncConfig, store: &dyn ObjectStore) -> Result<bool, SyncError> {
    let connectivity = |source: StoreError| SyncError::Connectivity {
        bucket: config.bucket.clone(),
        source,
    };

    if store.bucket_exists(&config.bucket).map_err(connectivity)? {
        return Ok(true);
    }

    match config.direction {
        SyncDirection::Download => Err(connectivity(StoreError::NoSuchBucket(
            config.bucket.clone(),
        ))),
        SyncDirection::Upload if config.dry_run => {
            tracing::info!("bucket {} does not exist; it would be created", config.bucket);
            Ok(false)
        }
        SyncDirection::Upload => {
            tracing::info!("creating bucket {}", config.bucket);
            store.create_bucket(&config.bucket).map_err(connectivity)?;
            Ok(true)
        }
    }
}

fn remote_inventory(
    store: &dyn ObjectStore,
    bucket: &str,
    bucket_present: bool,
) -> Result<Inventory, SyncError> {
    if bucket_present {
        build_remote(store, bucket)
    } else {
        Ok(Inventory::new())
    }
}

/// A download into a directory that does not exist yet starts from nothing.
fn local_destination(config: &SyncConfig) -> Result<Inventory, SyncError> {
    if config.local_root.exists() {
        build_local(&config.local_root)
    } else {
        tracing::debug!("{} does not exist yet", config.local_root.display());
        Ok(Inventory::new())
    }
}
