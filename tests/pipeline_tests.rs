use std::collections::HashSet;
use std::fs;
use std::path::Path;

use linedup::config::{ConfigError, DedupConfig, DEFAULT_NORMALIZER_PATTERN};
use linedup::pipeline::{run_dedup, run_encode, run_merge};
use tempfile::tempdir;

fn config(root: &Path, inputs: Vec<String>) -> DedupConfig {
    DedupConfig {
        inputs,
        shard_root: root.join("shards"),
        output: root.join("out.txt"),
        digest: "sha1".to_string(),
        pattern: DEFAULT_NORMALIZER_PATTERN.to_string(),
        workers: 2,
        chunk_size: 16,
        max_block_size: None,
        keep_shards: false,
        sort_shards: false,
        prefix_length: 2,
    }
}

fn write_corpus(path: &Path, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).unwrap();
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Collect output lines across all blocks (or the single unsuffixed file).
fn read_all_output(root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let single = root.join("out.txt");
    if single.exists() {
        lines.extend(read_lines(&single));
    }
    for index in 0..64 {
        let block = root.join(format!("out.txt.{index}"));
        if block.exists() {
            lines.extend(read_lines(&block));
        }
    }
    lines
}

#[test]
fn test_dedup_abca_scenario() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["a", "b", "a", "c"]);

    let config = config(dir.path(), vec![input.display().to_string()]);
    let stats = run_dedup(&config, None).unwrap();

    assert_eq!(stats.records_seen, 4);
    assert_eq!(stats.records_kept, 3);
    assert_eq!(stats.retained_percentage(), Some(75.0));

    let output: HashSet<String> = read_lines(&dir.path().join("out.txt")).into_iter().collect();
    let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(output, expected);

    // Default mode deletes the shard tree.
    assert!(!dir.path().join("shards").exists());
}

#[test]
fn test_dedup_without_duplicates_preserves_multiset() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    let lines: Vec<String> = (0..100).map(|i| format!("unique line {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_corpus(&input, &refs);

    let config = config(dir.path(), vec![input.display().to_string()]);
    let stats = run_dedup(&config, None).unwrap();

    assert_eq!(stats.records_seen, 100);
    assert_eq!(stats.records_kept, 100);
    assert_eq!(stats.retained_percentage(), Some(100.0));

    let mut output = read_lines(&dir.path().join("out.txt"));
    output.sort();
    let mut expected = lines;
    expected.sort();
    assert_eq!(output, expected);
}

#[test]
fn test_first_seen_wins_across_input_files() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a_first.txt");
    let second = dir.path().join("b_second.txt");
    // "hello!" and "hello?" normalize identically, so they share a
    // fingerprint; the line from the file encoded first must survive.
    write_corpus(&first, &["hello!"]);
    write_corpus(&second, &["hello?"]);

    let config = config(
        dir.path(),
        vec![first.display().to_string(), second.display().to_string()],
    );
    let stats = run_dedup(&config, None).unwrap();

    assert_eq!(stats.records_seen, 2);
    assert_eq!(stats.records_kept, 1);
    assert_eq!(read_lines(&dir.path().join("out.txt")), vec!["hello!"]);
}

#[test]
fn test_blank_lines_and_whitespace_are_skipped() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    fs::write(&input, "  padded  \n\n   \nplain\n").unwrap();

    let config = config(dir.path(), vec![input.display().to_string()]);
    let stats = run_dedup(&config, None).unwrap();

    assert_eq!(stats.records_seen, 2);
    let output: HashSet<String> = read_lines(&dir.path().join("out.txt")).into_iter().collect();
    let expected: HashSet<String> = ["padded", "plain"].iter().map(|s| s.to_string()).collect();
    assert_eq!(output, expected);
}

#[test]
fn test_block_budget_numbered_blocks() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["a", "b", "c"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    // Every 2-byte contribution exceeds the budget alone: one block per
    // shard, and block 0 is skipped by the very first overflow.
    config.max_block_size = Some(1);
    run_dedup(&config, None).unwrap();

    assert!(!dir.path().join("out.txt").exists());
    assert!(!dir.path().join("out.txt.0").exists());
    for index in 1..=3 {
        let block = read_lines(&dir.path().join(format!("out.txt.{index}")));
        assert_eq!(block.len(), 1, "block {index} must hold one contribution");
    }

    let output: HashSet<String> = read_all_output(dir.path()).into_iter().collect();
    let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(output, expected);
}

#[test]
fn test_block_budget_large_enough_single_block() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["a", "b", "c"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.max_block_size = Some(1024);
    run_dedup(&config, None).unwrap();

    // Everything fits: a single numbered block, within budget.
    let block = dir.path().join("out.txt.0");
    assert!(block.exists());
    assert!(!dir.path().join("out.txt.1").exists());
    assert!(fs::metadata(&block).unwrap().len() <= 1024);
    assert_eq!(read_lines(&block).len(), 3);
}

#[test]
fn test_blocks_never_exceed_budget_unless_single_shard() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    let lines: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_corpus(&input, &refs);

    let budget = 32u64;
    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.max_block_size = Some(budget);
    config.keep_shards = true;
    run_dedup(&config, None).unwrap();

    // Contribution size per shard: line bytes plus one newline per line.
    let shards = linedup::shard::enumerate_shards(&dir.path().join("shards"), 2).unwrap();
    let contributions: Vec<u64> = shards
        .iter()
        .map(|shard| {
            read_lines(shard)
                .iter()
                .map(|r| r.split_once(' ').unwrap().1.len() as u64 + 1)
                .sum()
        })
        .collect();

    let mut total_lines = 0;
    for index in 0..200 {
        let block = dir.path().join(format!("out.txt.{index}"));
        if !block.exists() {
            continue;
        }
        total_lines += read_lines(&block).len();
        let size = fs::metadata(&block).unwrap().len();
        // An over-budget block must be exactly one shard's oversized
        // contribution, never two or more merged together.
        if size > budget {
            assert!(
                contributions.iter().any(|&c| c == size && c > budget),
                "block {index} of {size} bytes is not a single oversized shard"
            );
        }
    }
    assert_eq!(total_lines, 50);
}

#[test]
fn test_keep_retains_shard_tree() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["a", "b", "a"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.keep_shards = true;
    run_dedup(&config, None).unwrap();

    assert!(dir.path().join("shards").exists());
    let shards = linedup::shard::enumerate_shards(&dir.path().join("shards"), 2).unwrap();
    assert_eq!(shards.len(), 2);
}

#[test]
fn test_sort_compacts_retained_shards() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    // "x!" and "x?" share a fingerprint; the shard holds two records until
    // compaction reduces it to the first-seen survivor.
    write_corpus(&input, &["x!", "x?", "y"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.keep_shards = true;
    config.sort_shards = true;
    let stats = run_dedup(&config, None).unwrap();
    assert_eq!(stats.records_seen, 3);
    assert_eq!(stats.records_kept, 2);

    let shards = linedup::shard::enumerate_shards(&dir.path().join("shards"), 2).unwrap();
    for shard in shards {
        let records = read_lines(&shard);
        // One record per surviving fingerprint, sorted.
        let fingerprints: Vec<String> = records
            .iter()
            .map(|r| r.split_once(' ').unwrap().0.to_string())
            .collect();
        let unique: HashSet<&String> = fingerprints.iter().collect();
        assert_eq!(unique.len(), fingerprints.len());
        let mut sorted = fingerprints.clone();
        sorted.sort();
        assert_eq!(fingerprints, sorted);
        // The duplicate pair survives as its first-seen line.
        for record in &records {
            assert_ne!(record.split_once(' ').unwrap().1, "x?");
        }
    }
}

#[test]
fn test_sort_without_keep_fails_before_any_file_work() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["a"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.sort_shards = true;
    let err = run_dedup(&config, None).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::SortRequiresKeep)
    ));
    assert!(!dir.path().join("shards").exists());
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn test_prefix_length_below_minimum_rejected() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), vec!["whatever.txt".to_string()]);
    config.prefix_length = 1;
    let err = run_dedup(&config, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::PrefixTooShort(1))
    ));
}

#[test]
fn test_unknown_digest_rejected_before_io() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), vec!["whatever.txt".to_string()]);
    config.digest = "md5".to_string();
    let err = run_dedup(&config, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::UnknownDigest(_))
    ));
    assert!(!dir.path().join("shards").exists());
}

#[test]
fn test_missing_input_aborts_run() {
    let dir = tempdir().unwrap();
    let config = config(dir.path(), vec!["no/such/file-*.txt".to_string()]);
    assert!(run_dedup(&config, None).is_err());
}

#[test]
fn test_encode_then_merge_matches_full_dedup() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["one", "two", "one", "three", "two"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.keep_shards = true;

    let records = run_encode(&config, None).unwrap();
    assert_eq!(records, 5);

    let stats = run_merge(&config, None).unwrap();
    assert_eq!(stats.records_seen, 5);
    assert_eq!(stats.records_kept, 3);

    let output: HashSet<String> = read_lines(&dir.path().join("out.txt")).into_iter().collect();
    let expected: HashSet<String> = ["one", "two", "three"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(output, expected);
}

#[test]
fn test_merge_of_empty_shard_root_reports_no_records() {
    let dir = tempdir().unwrap();
    let config = config(dir.path(), Vec::new());
    let stats = run_merge(&config, None).unwrap();
    assert_eq!(stats.records_seen, 0);
    assert!(stats.retained_percentage().is_none());
}

#[test]
fn test_merge_rejects_malformed_shard_record() {
    let dir = tempdir().unwrap();
    let shard_dir = dir.path().join("shards");
    fs::create_dir_all(&shard_dir).unwrap();
    fs::write(shard_dir.join("ab.shard"), "ab11 fine\nab22-truncated-no-separator\n").unwrap();

    let config = config(dir.path(), Vec::new());
    let err = run_merge(&config, None).unwrap_err();
    assert!(err.to_string().contains("Malformed record"));
}

#[test]
fn test_odd_prefix_length_end_to_end() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    write_corpus(&input, &["alpha", "beta", "alpha"]);

    let mut config = config(dir.path(), vec![input.display().to_string()]);
    config.prefix_length = 5;
    let stats = run_dedup(&config, None).unwrap();

    assert_eq!(stats.records_seen, 3);
    assert_eq!(stats.records_kept, 2);
    let output: HashSet<String> = read_lines(&dir.path().join("out.txt")).into_iter().collect();
    let expected: HashSet<String> = ["alpha", "beta"].iter().map(|s| s.to_string()).collect();
    assert_eq!(output, expected);
}
