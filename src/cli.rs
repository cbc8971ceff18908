//! Command-line interface definitions for linedup.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. The CLI follows standard conventions with global options
//! (verbosity, structured errors) and one subcommand per pipeline stage.
//!
//! # Example
//!
//! ```bash
//! # Full pipeline: encode, merge, delete shards
//! linedup dedup -i corpus/*.txt -s /tmp/shards -o deduped.txt
//!
//! # Block-budgeted output, shards kept and compacted
//! linedup dedup -i corpus.txt -s shards -o out --max-block-size 2.5gb --keep --sort
//!
//! # Stages run independently
//! linedup encode -i corpus.txt -s shards
//! linedup merge -s shards -o deduped.txt
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    default_workers, DedupConfig, DEFAULT_CHUNK_SIZE, DEFAULT_NORMALIZER_PATTERN,
    DEFAULT_PREFIX_LENGTH,
};

/// Memory-friendly deduplicator for line-oriented text corpora.
///
/// linedup fingerprints every line, routes records into on-disk shards by
/// fingerprint prefix, and merges each shard independently so the corpus
/// never has to fit in memory.
#[derive(Debug, Parser)]
#[command(name = "linedup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for linedup.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: encode inputs, merge shards, clean up
    Dedup(DedupArgs),
    /// Encode inputs into the shard tree without merging
    Encode(EncodeArgs),
    /// Merge an existing shard tree into deduplicated output
    Merge(MergeArgs),
}

/// Arguments for the dedup subcommand.
#[derive(Debug, Args)]
pub struct DedupArgs {
    /// Input text files, directories, or glob patterns
    #[arg(short, long = "inputs", value_name = "PATH", required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Shard directory
    #[arg(short, long, value_name = "DIR")]
    pub shard_root: PathBuf,

    /// Deduplicated output path
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Fingerprint digest (sha1, sha256, blake3)
    #[arg(short = 'f', long, value_name = "NAME", default_value = "sha1")]
    pub digest: String,

    /// Normalizer inclusion character class
    #[arg(short = 'r', long, value_name = "CLASS", default_value = DEFAULT_NORMALIZER_PATTERN)]
    pub pattern: String,

    /// Number of fingerprint workers (default: available cores - 1)
    #[arg(short = 'p', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Lines handed to each worker per batch
    #[arg(short = 'c', long, value_name = "N", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Maximum output block size (e.g. 512, 10k, 23Mb, 4.5gb)
    ///
    /// Without a budget all output goes to a single file; with one, output
    /// becomes a numbered sequence (output.0, output.1, ...).
    #[arg(short = 'b', long, value_name = "SIZE", value_parser = parse_block_size)]
    pub max_block_size: Option<u64>,

    /// Sort and compact retained shard files (requires --keep)
    #[arg(short = 't', long)]
    pub sort: bool,

    /// Keep the shard tree after merging
    #[arg(short = 'k', long)]
    pub keep: bool,

    /// Leading fingerprint characters used for shard routing (>= 2)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PREFIX_LENGTH)]
    pub prefix_length: usize,
}

impl DedupArgs {
    /// Convert CLI arguments into the pipeline configuration.
    #[must_use]
    pub fn into_config(self) -> DedupConfig {
        DedupConfig {
            inputs: self.inputs,
            shard_root: self.shard_root,
            output: self.output,
            digest: self.digest,
            pattern: self.pattern,
            workers: self.workers.unwrap_or_else(default_workers),
            chunk_size: self.chunk_size,
            max_block_size: self.max_block_size,
            keep_shards: self.keep,
            sort_shards: self.sort,
            prefix_length: self.prefix_length,
        }
    }
}

/// Arguments for the encode subcommand.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Input text files, directories, or glob patterns
    #[arg(short, long = "inputs", value_name = "PATH", required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Shard directory
    #[arg(short, long, value_name = "DIR")]
    pub shard_root: PathBuf,

    /// Fingerprint digest (sha1, sha256, blake3)
    #[arg(short = 'f', long, value_name = "NAME", default_value = "sha1")]
    pub digest: String,

    /// Normalizer inclusion character class
    #[arg(short = 'r', long, value_name = "CLASS", default_value = DEFAULT_NORMALIZER_PATTERN)]
    pub pattern: String,

    /// Number of fingerprint workers (default: available cores - 1)
    #[arg(short = 'p', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Lines handed to each worker per batch
    #[arg(short = 'c', long, value_name = "N", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Leading fingerprint characters used for shard routing (>= 2)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PREFIX_LENGTH)]
    pub prefix_length: usize,
}

impl EncodeArgs {
    /// Convert CLI arguments into the pipeline configuration.
    ///
    /// Encode-only runs always keep their shards; there is nothing else to
    /// show for the work.
    #[must_use]
    pub fn into_config(self) -> DedupConfig {
        DedupConfig {
            inputs: self.inputs,
            shard_root: self.shard_root,
            output: PathBuf::new(),
            digest: self.digest,
            pattern: self.pattern,
            workers: self.workers.unwrap_or_else(default_workers),
            chunk_size: self.chunk_size,
            max_block_size: None,
            keep_shards: true,
            sort_shards: false,
            prefix_length: self.prefix_length,
        }
    }
}

/// Arguments for the merge subcommand.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Shard directory
    #[arg(short, long, value_name = "DIR")]
    pub shard_root: PathBuf,

    /// Deduplicated output path
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Maximum output block size (e.g. 512, 10k, 23Mb, 4.5gb)
    #[arg(short = 'b', long, value_name = "SIZE", value_parser = parse_block_size)]
    pub max_block_size: Option<u64>,

    /// Sort and compact shard files after merging
    #[arg(short = 't', long)]
    pub sort: bool,

    /// Leading fingerprint characters used for shard routing (>= 2)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PREFIX_LENGTH)]
    pub prefix_length: usize,
}

impl MergeArgs {
    /// Convert CLI arguments into the pipeline configuration.
    ///
    /// A standalone merge never deletes the shard tree, so shard retention
    /// is implied and `--sort` is always permitted.
    #[must_use]
    pub fn into_config(self) -> DedupConfig {
        DedupConfig {
            inputs: Vec::new(),
            shard_root: self.shard_root,
            output: self.output,
            digest: "sha1".to_string(),
            pattern: DEFAULT_NORMALIZER_PATTERN.to_string(),
            workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_block_size: self.max_block_size,
            keep_shards: true,
            sort_shards: self.sort,
            prefix_length: self.prefix_length,
        }
    }
}

/// Parse a human-readable block size string into bytes.
///
/// Bare integers pass through unchanged. A numeric value (integer or
/// fractional) followed by a case-insensitive `k`, `m`, or `g` (with an
/// optional trailing `b`) scales by 1024, 1024^2, or 1024^3.
///
/// # Examples
///
/// ```
/// use linedup::cli::parse_block_size;
///
/// assert_eq!(parse_block_size("512").unwrap(), 512);
/// assert_eq!(parse_block_size("10k").unwrap(), 10_240);
/// assert_eq!(parse_block_size("2.5mb").unwrap(), 2_621_440);
/// assert_eq!(parse_block_size("4Gb").unwrap(), 4_294_967_296);
/// ```
///
/// # Errors
///
/// Returns an error for anything non-numeric and non-suffixed.
pub fn parse_block_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Block size cannot be empty".to_string());
    }
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }

    let invalid = || format!("Invalid block size '{s}' (examples: 512, 10k, 23Mb, 4.5gb)");

    let lower = s.to_ascii_lowercase();
    let idx = lower.find(['k', 'm', 'g']).ok_or_else(invalid)?;
    let factor: u64 = match &lower[idx..=idx] {
        "k" => 1 << 10,
        "m" => 1 << 20,
        "g" => 1 << 30,
        _ => return Err(invalid()),
    };

    let rest = &lower[idx + 1..];
    if !(rest.is_empty() || rest == "b") {
        return Err(invalid());
    }

    let value: f64 = lower[..idx].parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }

    Ok((value * factor as f64) as u64)
}
