//! Flags and run loop shared by `push` and `pull`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::{Color, Colorize};

use bucketsync_core::{config, FailurePolicy, SyncConfig, SyncDirection};
use bucketsync_store::{S3Settings, S3Store, StoreOverrides};
use bucketsync_sync::{pipeline, Action, KeyOutcome, SyncReport};

/// Which bucket, and how to reach it.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Bucket name.
    #[arg(short, long)]
    pub bucket: String,

    /// Custom S3 endpoint, e.g. `http://localhost:4566` for LocalStack.
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Store region [default: us-east-1].
    #[arg(short, long)]
    pub region: Option<String>,
}

/// How the run behaves.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Delete destination entries that do not exist in the source.
    #[arg(short, long)]
    pub delete: bool,

    /// Show what would be transferred or deleted without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Attempt every key even after a failure, then report all failures.
    #[arg(long)]
    pub keep_going: bool,

    /// Emit the run report as JSON instead of per-key lines.
    #[arg(long)]
    pub json: bool,
}

pub(crate) fn execute(
    direction: SyncDirection,
    local_root: PathBuf,
    store_args: StoreArgs,
    run_args: RunArgs,
) -> Result<()> {
    let profile = config::load().context("failed to load ~/.bucketsync/config.yaml")?;
    let overrides = StoreOverrides {
        endpoint: store_args.endpoint,
        region: store_args.region,
    };
    let settings =
        S3Settings::resolve(&overrides, &profile).context("cannot configure object store")?;
    let store = S3Store::new(settings).context("cannot configure object store")?;

    let config = SyncConfig {
        local_root,
        bucket: store_args.bucket,
        direction,
        delete_extraneous: run_args.delete,
        dry_run: run_args.dry_run,
        failure_policy: if run_args.keep_going {
            FailurePolicy::CollectAll
        } else {
            FailurePolicy::FailFast
        },
    };

    let json = run_args.json;
    let report = pipeline::run_with(&config, &store, &mut |outcome: &KeyOutcome| {
        if !json {
            print_outcome(&config, outcome);
        }
    })
    .with_context(|| format!("{direction} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_outcome(config: &SyncConfig, outcome: &KeyOutcome) {
    let key = &outcome.key;
    let bucket = &config.bucket;
    let local = config.local_root.join(key.as_str());
    let remote = format!("s3://{bucket}/{key}");

    let (line, color) = match (outcome.action, config.direction) {
        (Action::Unchanged, _) => (format!("Skipped (unchanged): {key}"), Color::BrightBlack),
        (Action::Transferred, SyncDirection::Upload) => {
            (format!("Uploaded {} to {remote}", local.display()), Color::Green)
        }
        (Action::Transferred, SyncDirection::Download) => {
            (format!("Downloaded {remote} to {}", local.display()), Color::Green)
        }
        (Action::Deleted, SyncDirection::Upload) => (format!("Deleted {remote}"), Color::Red),
        (Action::Deleted, SyncDirection::Download) => {
            (format!("Deleted local file: {}", local.display()), Color::Red)
        }
        (Action::WouldTransfer, SyncDirection::Upload) => (
            format!("[dry-run] Would upload {} to {remote}", local.display()),
            Color::Yellow,
        ),
        (Action::WouldTransfer, SyncDirection::Download) => (
            format!("[dry-run] Would download {remote} to {}", local.display()),
            Color::Yellow,
        ),
        (Action::WouldDelete, SyncDirection::Upload) => {
            (format!("[dry-run] Would delete {remote}"), Color::Yellow)
        }
        (Action::WouldDelete, SyncDirection::Download) => (
            format!("[dry-run] Would delete local file: {}", local.display()),
            Color::Yellow,
        ),
    };
    println!("{}", line.as_str().color(color));
}

fn print_summary(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if report.is_noop() {
        println!(
            "{prefix}✓ nothing to do ({} unchanged)",
            report.unchanged()
        );
        return;
    }

    if report.dry_run {
        println!(
            "{prefix}✓ {} planned ({} to transfer, {} to delete, {} unchanged)",
            report.direction,
            report.count(Action::WouldTransfer),
            report.count(Action::WouldDelete),
            report.unchanged()
        );
    } else {
        println!(
            "✓ {} complete ({} transferred, {} deleted, {} unchanged) in {} ms",
            report.direction,
            report.transferred(),
            report.deleted(),
            report.unchanged(),
            report.duration_ms
        );
    }
}
