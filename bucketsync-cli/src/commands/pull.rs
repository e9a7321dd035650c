//! `bucketsync pull`: bucket → local directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bucketsync_core::SyncDirection;

use super::run::{execute, RunArgs, StoreArgs};

/// Arguments for `bucketsync pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Local directory to download into. Created if missing.
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        execute(SyncDirection::Download, self.output, self.store, self.run)
    }
}
