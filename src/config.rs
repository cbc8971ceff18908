//! Pipeline configuration and fail-fast validation.
//!
//! All option checks in this module run before any filesystem work: a bad
//! digest name, size string, prefix length, or flag combination must never
//! surface after shard files have started to accumulate.

use std::path::PathBuf;

use crate::encoder::DigestFn;

/// Minimum shard prefix length. A prefix shorter than one path segment
/// cannot be split into directories.
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Default shard prefix length (two directory levels).
pub const DEFAULT_PREFIX_LENGTH: usize = 4;

/// Default per-worker chunk size, in lines.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Default inclusion character class for the normalizer: digits, Hangul
/// syllables and jamo, and ASCII letters.
pub const DEFAULT_NORMALIZER_PATTERN: &str = "0-9가-힣ㄱ-ㅎㅏ-ㅣa-zA-Z";

/// Errors caught during configuration validation, before any file I/O.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The digest name is not one of the supported built-ins.
    #[error("Unsupported digest '{0}': expected one of sha1, sha256, blake3")]
    UnknownDigest(String),

    /// `--sort` rewrites shard files in place, which only makes sense when
    /// they are retained.
    #[error("--sort is available only together with --keep")]
    SortRequiresKeep,

    /// The shard prefix is too short to form a path segment.
    #[error("Prefix length must be at least {MIN_PREFIX_LENGTH}, got {0}")]
    PrefixTooShort(usize),

    /// The normalizer inclusion class is not a valid character class body.
    #[error("Invalid normalizer pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending character class
        pattern: String,
        /// The underlying regex error
        #[source]
        source: regex::Error,
    },
}

/// Flat option set driving the dedup pipeline.
///
/// Mirrors the CLI surface one-to-one; see [`crate::cli`] for defaults and
/// flag documentation.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Input files, directories, or glob patterns.
    pub inputs: Vec<String>,
    /// Root directory of the on-disk shard tree.
    pub shard_root: PathBuf,
    /// Deduplicated output path (base name when block budgeting is on).
    pub output: PathBuf,
    /// Named digest selecting the fingerprint function.
    pub digest: String,
    /// Inclusion character class for the normalizer.
    pub pattern: String,
    /// Worker count for parallel fingerprinting.
    pub workers: usize,
    /// Lines handed to each worker per batch; batches hold
    /// `workers * chunk_size` lines.
    pub chunk_size: usize,
    /// Optional output block budget in bytes. `None` writes a single file.
    pub max_block_size: Option<u64>,
    /// Keep the shard tree after merging instead of deleting it.
    pub keep_shards: bool,
    /// Rewrite retained shards sorted and compacted (requires `keep_shards`).
    pub sort_shards: bool,
    /// Number of leading fingerprint characters used for shard routing.
    pub prefix_length: usize,
}

impl DedupConfig {
    /// Validate the configuration without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown digest name, a prefix length
    /// below [`MIN_PREFIX_LENGTH`], `sort_shards` without `keep_shards`, or
    /// an invalid normalizer pattern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix_length < MIN_PREFIX_LENGTH {
            return Err(ConfigError::PrefixTooShort(self.prefix_length));
        }
        if self.sort_shards && !self.keep_shards {
            return Err(ConfigError::SortRequiresKeep);
        }
        DigestFn::named(&self.digest)?;
        crate::encoder::Normalizer::new(&self.pattern)?;
        Ok(())
    }
}

/// Default worker count: one less than the available parallelism, at least 1.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
