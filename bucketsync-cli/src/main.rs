//! bucketsync: one-way sync between a local directory and an S3 bucket.
//!
//! # Usage
//!
//! ```text
//! bucketsync push -i <dir> -b <bucket> [-e <endpoint>] [-r <region>] [-d] [--dry-run] [--keep-going] [--json]
//! bucketsync pull -o <dir> -b <bucket> [-e <endpoint>] [-r <region>] [-d] [--dry-run] [--keep-going] [--json]
//! ```
//!
//! Store credentials come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
//! or `~/.bucketsync/config.yaml`.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{pull::PullArgs, push::PushArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "bucketsync",
    version,
    about = "Sync a local directory with an S3-compatible bucket",
    long_about = None,
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local directory to a bucket.
    Push(PushArgs),

    /// Download a bucket into a local directory.
    Pull(PullArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Push(args) => args.run(),
        Commands::Pull(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
