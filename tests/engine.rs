use chrono::{DateTime, Utc};
use gitstats::collect::{self, Refined};
use gitstats::config::{CollectorConfig, LogRange};
use gitstats::error::{Result, StatsError};
use gitstats::git::{Oracle, Walk};
use gitstats::model::ContentId;
use gitstats::snapshot::Snapshot;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

fn id(c: char) -> String {
    c.to_string().repeat(40)
}

/// Scripted history of five commits and two tags.
struct FakeOracle {
    tree_files: BTreeMap<String, u64>,
    blob_lines: BTreeMap<String, u64>,
    tree_queries: AtomicUsize,
    blob_queries: AtomicUsize,
    fail_blobs: bool,
}

impl FakeOracle {
    fn new() -> Self {
        Self {
            tree_files: BTreeMap::from([(id('1'), 1), (id('2'), 2), (id('3'), 3)]),
            blob_lines: BTreeMap::from([(id('a'), 2), (id('b'), 30), (id('c'), 12)]),
            tree_queries: AtomicUsize::new(0),
            blob_queries: AtomicUsize::new(0),
            fail_blobs: false,
        }
    }

    fn expensive_queries(&self) -> usize {
        self.tree_queries.load(Ordering::SeqCst) + self.blob_queries.load(Ordering::SeqCst)
    }
}

impl Oracle for FakeOracle {
    fn tag_refs(&self) -> Result<String> {
        Ok(format!(
            "{} refs/tags/v1\n{} refs/tags/v2\n",
            id('d'),
            id('e')
        ))
    }

    fn revision_header(&self, revision: &str) -> Result<String> {
        Ok(match revision.chars().next() {
            Some('d') => "1700050000 Ada".to_string(),
            Some('e') => "1700200000 Bob".to_string(),
            _ => String::new(),
        })
    }

    fn shortlog(&self, revisions: &[String]) -> Result<String> {
        let revisions: Vec<&str> = revisions.iter().map(String::as_str).collect();
        Ok(match revisions.as_slice() {
            ["HEAD"] => "     3\tAda\n     2\tBob\n",
            ["refs/tags/v1"] => "     2\tAda\n",
            ["refs/tags/v2", "^refs/tags/v1"] => "     1\tAda\n     1\tBob\n",
            _ => "",
        }
        .to_string())
    }

    fn commit_log(&self, _range: &LogRange) -> Result<String> {
        Ok([
            format!("commit {}", id('5')),
            "1700300000 2023-11-18 09:46:40 +0000 Bob <bob@builders.org>".to_string(),
            format!("commit {}", id('4')),
            "1700200000 2023-11-17 05:46:40 +0000 Bob <bob@builders.org>".to_string(),
            format!("commit {}", id('3')),
            "1700100000 2023-11-16 01:53:20 +0200 Ada <ada@analytical.org>".to_string(),
            format!("commit {}", id('2')),
            "1700050000 2023-11-15 12:06:40 +0200 Ada <ada@analytical.org>".to_string(),
            format!("commit {}", id('1')),
            "1700000000 2023-11-14 22:13:20 +0200 Ada <ada@analytical.org>".to_string(),
        ]
        .join("\n"))
    }

    fn tree_log(&self, _range: &LogRange) -> Result<String> {
        Ok([
            (1700300000, '3'),
            (1700200000, '3'),
            (1700100000, '2'),
            (1700050000, '2'),
            (1700000000, '1'),
        ]
        .iter()
        .map(|(stamp, tree)| format!("commit {}\n{stamp} {}", id('f'), id(*tree)))
        .collect::<Vec<_>>()
        .join("\n"))
    }

    fn shortstat_log(&self, _range: &LogRange, _walk: Walk) -> Result<String> {
        Ok("1700300000 Bob\n\n 1 file changed, 5 insertions(+)\n\
            1700200000 Bob\n\n 2 files changed, 10 insertions(+), 3 deletions(-)\n\
            1700100000 Ada\n\n 1 file changed, 1 deletion(-)\n\
            1700050000 Ada\n\n 1 file changed, 20 insertions(+)\n\
            1700000000 Ada\n\n 1 file changed, 2 insertions(+)\n"
            .to_string())
    }

    fn tree_listing(&self, _revision: &str) -> Result<String> {
        Ok([
            format!("100644 blob {}      10\tREADME", id('a')),
            format!("100644 blob {}     100\tsrc/main.rs", id('b')),
            format!("100644 blob {}      50\tsrc/lib.rs", id('c')),
            format!("160000 commit {}       -\tvendor/dep", id('9')),
        ]
        .join("\0"))
    }

    fn count_files_in_tree(&self, tree: &ContentId) -> Result<u64> {
        self.tree_queries.fetch_add(1, Ordering::SeqCst);
        self.tree_files
            .get(tree.as_str())
            .copied()
            .ok_or_else(|| StatsError::Parse(format!("unknown tree {tree}")))
    }

    fn count_lines_in_blob(&self, blob: &ContentId) -> Result<u64> {
        self.blob_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_blobs {
            return Err(StatsError::Parse(format!("cannot read {blob}")));
        }
        self.blob_lines
            .get(blob.as_str())
            .copied()
            .ok_or_else(|| StatsError::Parse(format!("unknown blob {blob}")))
    }
}

fn config() -> CollectorConfig {
    CollectorConfig {
        processes: 2,
        ..CollectorConfig::default()
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap()
}

fn json(refined: &Refined) -> String {
    Snapshot::from_refined(refined, epoch()).to_json().unwrap()
}

fn run(oracle: &FakeOracle, cache: &Path) -> Refined {
    collect::run(oracle, cache, &config()).unwrap()
}

#[test]
fn warm_run_matches_cold_run_without_expensive_queries() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join("cache.db");
    let oracle = FakeOracle::new();

    let cold = run(&oracle, &cache);
    assert_eq!(oracle.expensive_queries(), 6);
    assert!(cache.exists());

    let warm = run(&oracle, &cache);
    assert_eq!(oracle.expensive_queries(), 6);
    assert_eq!(cold.aggregates(), warm.aggregates());
    assert_eq!(json(&cold), json(&warm));
}

#[test]
fn collected_tables() {
    let dir = tempdir().unwrap();
    let refined = run(&FakeOracle::new(), &dir.path().join("cache.db"));
    let stats = refined.aggregates();

    assert_eq!(stats.total_commits, 5);
    assert_eq!(stats.total_authors, 2);
    let author_sum: u64 = stats.authors.values().map(|a| a.commit_count).sum();
    assert_eq!(author_sum, stats.total_commits);
    assert_eq!(refined.authors_by_commits(), ["Ada", "Bob"]);

    assert_eq!(stats.files_by_stamp[&1700000000], 1);
    assert_eq!(stats.files_by_stamp[&1700100000], 2);
    assert_eq!(stats.files_by_stamp[&1700300000], 3);

    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_size, 160);
    assert_eq!(stats.extensions["rs"].file_count, 2);
    assert_eq!(stats.extensions["rs"].line_count, 42);
    assert_eq!(stats.extensions[""].line_count, 2);

    assert_eq!(stats.total_lines_added, 37);
    assert_eq!(stats.total_lines_removed, 4);
    assert_eq!(stats.total_lines, 33);
    assert_eq!(stats.changes_by_date[&1700300000].lines, 33);
    assert_eq!(stats.authors["Bob"].lines_added, 15);
    assert_eq!(stats.authors["Ada"].lines_removed, 1);

    assert_eq!(stats.domains["analytical.org"].commits, 3);
    assert_eq!(stats.commits_by_timezone["+0200"], 3);
    assert!(stats.warnings.is_empty());
}

#[test]
fn tag_deltas_are_disjoint() {
    let dir = tempdir().unwrap();
    let refined = run(&FakeOracle::new(), &dir.path().join("cache.db"));
    let tags = &refined.aggregates().tags;

    assert_eq!(tags["v1"].commit_count, 2);
    assert_eq!(tags["v2"].commit_count, 2);
    assert_eq!(tags["v2"].authors["Bob"], 1);
    let sum: u64 = tags.values().map(|t| t.commit_count).sum();
    assert!(sum <= refined.aggregates().total_commits);
}

#[test]
fn corrupt_cache_is_rebuilt() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join("cache.db");
    fs::write(&cache, b"definitely not sqlite").unwrap();

    let oracle = FakeOracle::new();
    let first = run(&oracle, &cache);
    assert_eq!(oracle.expensive_queries(), 6);

    let second = run(&oracle, &cache);
    assert_eq!(oracle.expensive_queries(), 6);
    assert_eq!(first.aggregates(), second.aggregates());
}

#[test]
fn fact_failing_twice_aborts() {
    let dir = tempdir().unwrap();
    let oracle = FakeOracle {
        fail_blobs: true,
        ..FakeOracle::new()
    };
    let err = collect::run(&oracle, &dir.path().join("cache.db"), &config()).unwrap_err();
    assert!(matches!(err, StatsError::Resolve { .. }));
    // Three distinct blobs from the pool, then one retry before giving up.
    assert_eq!(oracle.blob_queries.load(Ordering::SeqCst), 4);
}
