//! `bucketsync push`: local directory → bucket.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bucketsync_core::SyncDirection;

use super::run::{execute, RunArgs, StoreArgs};

/// Arguments for `bucketsync push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local directory to upload.
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        execute(SyncDirection::Upload, self.input, self.store, self.run)
    }
}
