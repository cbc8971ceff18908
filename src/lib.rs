//! linedup - Memory-friendly Text Deduplication
//!
//! A Rust CLI for deduplicating large line-oriented text corpora without
//! holding them in memory: lines are fingerprinted in parallel, routed into
//! on-disk shards by fingerprint prefix, and each shard is merged
//! independently with first-seen-wins semantics into size-bounded output
//! blocks.

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod shard;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::error::ExitCode;
use crate::merge::MergeStats;
use crate::progress::{Progress, ProgressCallback};

/// Run the application logic for parsed CLI arguments.
///
/// Initializes logging, dispatches the subcommand, and prints the final
/// summary (elapsed time plus the retained-percentage metric).
///
/// # Errors
///
/// Propagates configuration and pipeline errors; the caller maps them to
/// exit codes.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let progress: Option<Arc<dyn ProgressCallback>> = if cli.quiet {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    };

    let started = Instant::now();
    match cli.command {
        Commands::Dedup(args) => {
            let config = args.into_config();
            let stats = pipeline::run_dedup(&config, progress.as_ref())?;
            report_summary(&stats, started);
        }
        Commands::Encode(args) => {
            let config = args.into_config();
            let records = pipeline::run_encode(&config, progress.as_ref())?;
            println!(
                "encoded {} record(s) in {} seconds",
                records,
                started.elapsed().as_secs()
            );
        }
        Commands::Merge(args) => {
            let config = args.into_config();
            let stats = pipeline::run_merge(&config, progress.as_ref())?;
            report_summary(&stats, started);
        }
    }

    Ok(ExitCode::Success)
}

/// Print the final metric: percentage of input records retained.
fn report_summary(stats: &MergeStats, started: Instant) {
    match stats.retained_percentage() {
        Some(percentage) => println!(
            "acquired {percentage:.4}% deduplicated texts ({} of {} records)",
            stats.records_kept, stats.records_seen
        ),
        None => println!("no records seen"),
    }
    println!("elapsed time = {} seconds", started.elapsed().as_secs());
}
