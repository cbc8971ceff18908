//! Pipeline orchestration: input resolution, the streaming encode stage,
//! the merge pass, and shard-tree cleanup.
//!
//! The full pipeline is all-or-nothing: the first failed input file, shard
//! write, or malformed shard record aborts the run with no partial-result
//! salvage. Peak memory is bounded to one batch (`workers * chunk_size`
//! lines) during encoding and one shard during merging, independent of
//! corpus size.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::config::DedupConfig;
use crate::encoder::{DigestFn, Fingerprinter, Normalizer};
use crate::merge::{merge_shards, MergeOptions, MergeStats};
use crate::progress::ProgressCallback;
use crate::shard::ShardWriter;

/// Errors that can occur during input resolution and encoding.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// An I/O error occurred while opening or reading an input file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An input path does not exist and matched nothing as a glob pattern.
    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// An input string is not a valid glob pattern.
    #[error("Invalid input pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// The underlying glob error
        #[source]
        source: glob::PatternError,
    },

    /// A shard write failed.
    #[error(transparent)]
    Shard(#[from] crate::shard::ShardError),
}

/// Resolve input arguments to concrete file paths.
///
/// Each argument may be a file, a directory (expanded to its immediate
/// files), or a glob pattern. Expansions are sorted so repeated runs
/// process files in the same order; the arguments themselves keep their
/// given order.
///
/// # Errors
///
/// Returns [`EncodeError::InputNotFound`] for an argument that is neither
/// an existing path nor a pattern with matches - a silently empty input
/// would produce a silently empty corpus.
pub fn resolve_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, EncodeError> {
    let mut files = Vec::new();
    for raw in inputs {
        let path = Path::new(raw);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            let mut children: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|source| EncodeError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            children.sort();
            files.extend(children);
        } else {
            let matches = glob::glob(raw).map_err(|source| EncodeError::Pattern {
                pattern: raw.clone(),
                source,
            })?;
            let mut matched: Vec<PathBuf> = matches
                .filter_map(std::result::Result::ok)
                .filter(|p| p.is_file())
                .collect();
            if matched.is_empty() {
                return Err(EncodeError::InputNotFound(raw.clone()));
            }
            matched.sort();
            files.extend(matched);
        }
    }
    Ok(files)
}

/// Stream one input file through the encode stage.
///
/// Lines are trimmed, blanks skipped, and accumulated into batches of
/// `batch_size` lines. Each full batch (and the final partial one) is
/// fingerprinted in parallel and appended to the shard tree, then dropped.
///
/// Returns the number of records encoded.
///
/// # Errors
///
/// Returns [`EncodeError`] on the first read or shard-write failure; the
/// caller aborts the whole run.
pub fn encode_file(
    path: &Path,
    fingerprinter: &Fingerprinter,
    writer: &ShardWriter,
    batch_size: usize,
    chunk_size: usize,
) -> Result<u64, EncodeError> {
    let file = File::open(path).map_err(|source| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut records = 0u64;

    let mut flush = |batch: &mut Vec<String>| -> Result<u64, EncodeError> {
        let lines = std::mem::take(batch);
        let count = lines.len() as u64;
        let encoded = fingerprinter.encode_batch(lines, chunk_size);
        writer.write_batch(&encoded)?;
        Ok(count)
    };

    for line in reader.lines() {
        let line = line.map_err(|source| EncodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        batch.push(trimmed.to_string());
        if batch.len() >= batch_size {
            records += flush(&mut batch)?;
        }
    }
    if !batch.is_empty() {
        records += flush(&mut batch)?;
    }

    log::debug!("Encoded {}: {} records", path.display(), records);
    Ok(records)
}

/// Run the encode stage for every input in the configuration.
///
/// Returns the total number of records routed to shards.
pub fn run_encode(
    config: &DedupConfig,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<u64> {
    config.validate()?;

    let normalizer = Normalizer::new(&config.pattern)?;
    let digest = DigestFn::named(&config.digest)?;
    let fingerprinter = Fingerprinter::new(digest, normalizer, config.workers);
    let writer = ShardWriter::new(&config.shard_root, config.prefix_length);
    let batch_size = config.workers.max(1) * config.chunk_size.max(1);

    let files = resolve_inputs(&config.inputs)?;
    log::info!(
        "Encoding {} file(s) with {} worker(s), batch size {}",
        files.len(),
        config.workers,
        batch_size
    );

    if let Some(callback) = progress {
        callback.on_phase_start("encode", files.len());
    }

    let mut records = 0u64;
    for (idx, path) in files.iter().enumerate() {
        records += encode_file(path, &fingerprinter, &writer, batch_size, config.chunk_size)?;
        if let Some(callback) = progress {
            callback.on_progress(idx + 1, &path.display().to_string());
        }
    }

    if let Some(callback) = progress {
        callback.on_phase_end("encode");
    }

    log::info!("Encoded {records} record(s)");
    Ok(records)
}

/// Run the merge pass for the configuration's shard tree.
pub fn run_merge(
    config: &DedupConfig,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<MergeStats> {
    config.validate()?;

    let options = MergeOptions {
        output: config.output.clone(),
        max_block_size: config.max_block_size,
        sort_shards: config.sort_shards,
    };
    let stats = merge_shards(&config.shard_root, config.prefix_length, &options, progress)?;
    log::info!(
        "Merged {} shard(s): {} seen, {} kept",
        stats.shards,
        stats.records_seen,
        stats.records_kept
    );
    Ok(stats)
}

/// Run the full pipeline: encode, merge, then delete the shard tree unless
/// retention is requested.
pub fn run_dedup(
    config: &DedupConfig,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<MergeStats> {
    config.validate()?;

    run_encode(config, progress)?;
    let stats = run_merge(config, progress)?;

    if !config.keep_shards && config.shard_root.exists() {
        fs::remove_dir_all(&config.shard_root).map_err(|source| EncodeError::Io {
            path: config.shard_root.clone(),
            source,
        })?;
        log::debug!("Removed shard root {}", config.shard_root.display());
    }

    Ok(stats)
}
