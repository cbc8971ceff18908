//! Merge/block engine: per-shard first-seen-wins reduction into
//! size-bounded output blocks.
//!
//! Each shard is read wholesale, reduced to the first surviving line per
//! fingerprint, and its whole contribution appended to the current output
//! block. Shards are mutually independent; the only state threaded across
//! the loop is the explicit block accumulator ([`BlockWriter`]), which keeps
//! the no-split invariant: one shard's contribution always lands in exactly
//! one block, even when it alone exceeds the budget.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::progress::ProgressCallback;
use crate::shard::{enumerate_shards, ShardError};

/// Errors that can occur during the merge pass.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// An I/O error occurred while reading shards or writing blocks.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A shard record had no fingerprint/line separator. Typically a
    /// truncated trailing record from an interrupted encode; rejected rather
    /// than silently misparsed.
    #[error("Malformed record in {path} at line {line}")]
    MalformedRecord {
        /// The shard file containing the bad record
        path: PathBuf,
        /// 1-based line number of the bad record
        line: usize,
    },

    /// The shard tree could not be enumerated.
    #[error(transparent)]
    Shard(#[from] ShardError),
}

/// Options for the merge pass.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Deduplicated output path (base name when a block budget is set).
    pub output: PathBuf,
    /// Optional block budget in bytes. `None` writes a single file.
    pub max_block_size: Option<u64>,
    /// Rewrite each shard sorted and compacted after merging it.
    pub sort_shards: bool,
}

/// Running totals across all merged shards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Shard files merged.
    pub shards: usize,
    /// Total records read from shard files.
    pub records_seen: u64,
    /// Records surviving first-seen-wins reduction.
    pub records_kept: u64,
}

impl MergeStats {
    /// Percentage of input records retained, `None` when nothing was seen.
    #[must_use]
    pub fn retained_percentage(&self) -> Option<f64> {
        if self.records_seen == 0 {
            None
        } else {
            Some(100.0 * self.records_kept as f64 / self.records_seen as f64)
        }
    }
}

/// Size-bounded output block accumulator.
///
/// Blocks are created lazily on first append. When a budget is configured
/// and the running size plus the next contribution would exceed it, the
/// block index advances and the running size resets to that contribution
/// alone; without a budget everything targets the single base path.
struct BlockWriter {
    base: PathBuf,
    budget: Option<u64>,
    index: u64,
    size: u64,
    current: Option<BufWriter<fs::File>>,
}

impl BlockWriter {
    fn new(base: PathBuf, budget: Option<u64>) -> Self {
        Self {
            base,
            budget,
            index: 0,
            size: 0,
            current: None,
        }
    }

    /// Path of the block currently being written.
    fn current_path(&self) -> PathBuf {
        match self.budget {
            None => self.base.clone(),
            Some(_) => {
                let mut name = self.base.clone().into_os_string();
                name.push(format!(".{}", self.index));
                PathBuf::from(name)
            }
        }
    }

    /// Append one shard's entire contribution, advancing the block first if
    /// it would overflow the budget.
    fn write_contribution(&mut self, lines: &[&str], contribution: u64) -> Result<(), MergeError> {
        if let Some(budget) = self.budget {
            if self.size + contribution > budget {
                self.index += 1;
                self.size = contribution;
                self.current = None;
            } else {
                self.size += contribution;
            }
        } else {
            self.size += contribution;
        }

        let path = self.current_path();
        let writer = match self.current.as_mut() {
            Some(writer) => writer,
            None => {
                let file = fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .map_err(|source| MergeError::Io {
                        path: path.clone(),
                        source,
                    })?;
                self.current.insert(BufWriter::new(file))
            }
        };
        for line in lines {
            writeln!(writer, "{line}").map_err(|source| MergeError::Io {
                path: path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| MergeError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// One shard reduced to its surviving records.
#[derive(Debug)]
struct DedupedShard {
    /// `(fingerprint, line)` pairs in first-seen order.
    survivors: Vec<(String, String)>,
    /// Records read from the shard file before reduction.
    records_seen: u64,
}

/// Read a shard wholesale and keep the first line seen per fingerprint.
fn reduce_shard(path: &Path) -> Result<DedupedShard, MergeError> {
    let content = fs::read_to_string(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut survivors: Vec<(String, String)> = Vec::new();
    let mut records_seen = 0u64;

    for (idx, raw) in content.lines().enumerate() {
        let record = raw.trim();
        if record.is_empty() {
            continue;
        }
        let (fingerprint, line) =
            record
                .split_once(' ')
                .ok_or_else(|| MergeError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                })?;
        records_seen += 1;
        if !seen.contains(fingerprint) {
            seen.insert(fingerprint.to_string());
            survivors.push((fingerprint.to_string(), line.to_string()));
        }
    }

    Ok(DedupedShard {
        survivors,
        records_seen,
    })
}

/// Rewrite a shard in place: one record per surviving fingerprint, sorted.
fn compact_shard(path: &Path, survivors: &[(String, String)]) -> Result<(), MergeError> {
    let mut sorted: Vec<&(String, String)> = survivors.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut content = String::new();
    for (fingerprint, line) in sorted {
        content.push_str(fingerprint);
        content.push(' ');
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge every shard under `shard_root` into deduplicated output blocks.
///
/// Shards are processed sequentially in enumeration order. The contribution
/// size of a shard is the byte length of each surviving line plus one
/// newline per line.
///
/// # Errors
///
/// Returns [`MergeError`] on the first I/O failure or malformed record; the
/// merge is all-or-nothing and partially written blocks are not cleaned up.
pub fn merge_shards(
    shard_root: &Path,
    prefix_length: usize,
    options: &MergeOptions,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<MergeStats, MergeError> {
    let shards = enumerate_shards(shard_root, prefix_length)?;
    log::info!(
        "Merging {} shard(s) under {}",
        shards.len(),
        shard_root.display()
    );

    if let Some(parent) = options.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| MergeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    if let Some(callback) = progress {
        callback.on_phase_start("merge", shards.len());
    }

    let mut blocks = BlockWriter::new(options.output.clone(), options.max_block_size);
    let mut stats = MergeStats::default();

    for (idx, shard) in shards.iter().enumerate() {
        let reduced = reduce_shard(shard)?;
        stats.shards += 1;
        stats.records_seen += reduced.records_seen;
        stats.records_kept += reduced.survivors.len() as u64;

        let lines: Vec<&str> = reduced.survivors.iter().map(|(_, l)| l.as_str()).collect();
        let contribution: u64 = lines.iter().map(|l| l.len() as u64 + 1).sum();
        blocks.write_contribution(&lines, contribution)?;

        if options.sort_shards {
            compact_shard(shard, &reduced.survivors)?;
        }

        if let Some(callback) = progress {
            callback.on_progress(idx + 1, &shard.display().to_string());
        }
        log::trace!(
            "Merged {}: {} seen, {} kept",
            shard.display(),
            reduced.records_seen,
            reduced.survivors.len()
        );
    }

    if let Some(callback) = progress {
        callback.on_phase_end("merge");
    }

    Ok(stats)
}
