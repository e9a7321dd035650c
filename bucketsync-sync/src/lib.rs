//! # bucketsync-sync
//!
//! Inventory, diff and reconcile pipeline between a local directory and a
//! bucket.
//!
//! Build a [`SyncConfig`](bucketsync_core::SyncConfig) and call
//! [`pipeline::run`] (or [`pipeline::run_with`] for per-key progress) with
//! any [`ObjectStore`](bucketsync_store::ObjectStore).

pub mod diff;
pub mod error;
pub mod local;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod writer;

pub use diff::diff;
pub use error::{ActionError, SyncError};
pub use local::build_local;
pub use pipeline::{run, run_with, Stage};
pub use reconcile::Reconciler;
pub use remote::build_remote;
pub use report::{Action, KeyOutcome, SyncReport};
pub use writer::write_atomic;
