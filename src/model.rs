use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

pub const SCHEMA_VERSION: u32 = 1;

/// Hex object id of a tree or blob. Only these content-addressed ids are
/// accepted as cache keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Accepts a full SHA-1 (40) or SHA-256 (64) hex id.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid_len = raw.len() == 40 || raw.len() == 64;
        if valid_len && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One commit of the activity log: identity and timing only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub timestamp: i64,
    pub author_name: String,
    pub author_email: String,
    pub timezone_offset: String,
}

/// `<epoch> <author>` line of a shortstat log or a single-revision query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub timestamp: i64,
    pub author: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortstat {
    pub files: u64,
    pub inserted: u64,
    pub deleted: u64,
}

/// A commit header paired with the shortstat that followed it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub timestamp: i64,
    pub author_name: String,
    pub stat: Shortstat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefLine {
    pub revision_id: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortlogLine {
    pub commits: u64,
    pub author: String,
}

/// `<epoch> <tree-id>` line of the revision tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRevision {
    pub timestamp: i64,
    pub tree_id: ContentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub blob_id: ContentId,
    pub size: u64,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorEntry {
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub first_commit_timestamp: Option<i64>,
    pub last_commit_timestamp: Option<i64>,
    pub active_days: BTreeSet<String>,
    pub refined: Option<AuthorRefinement>,
}

impl AuthorEntry {
    pub fn record_commit(&mut self, timestamp: i64, day: String) {
        self.commit_count += 1;
        self.first_commit_timestamp = Some(
            self.first_commit_timestamp
                .map_or(timestamp, |first| first.min(timestamp)),
        );
        self.last_commit_timestamp = Some(
            self.last_commit_timestamp
                .map_or(timestamp, |last| last.max(timestamp)),
        );
        self.active_days.insert(day);
    }
}

/// Fields only known once every record has been folded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRefinement {
    pub rank_by_commits: usize,
    pub commit_share: f64,
    pub date_first: Option<String>,
    pub date_last: Option<String>,
    pub tenure: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainEntry {
    pub commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionEntry {
    pub file_count: u64,
    pub line_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub revision_id: String,
    pub timestamp: i64,
    pub date: String,
    pub commit_count: u64,
    pub authors: BTreeMap<String, u64>,
}

/// Project-wide churn as of one commit on the mainline walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChurnPoint {
    pub files: u64,
    pub inserted: u64,
    pub deleted: u64,
    pub total_inserted: u64,
    pub total_deleted: u64,
    pub lines: i64,
}

/// One author's running totals as of one commit on the full walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthorChurnPoint {
    pub lines_added: u64,
    pub commits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_accepts_full_hex_only() {
        let sha1 = "0123456789abcdef0123456789ABCDEF01234567";
        assert_eq!(
            ContentId::parse(sha1).map(|id| id.to_string()),
            Some(sha1.to_ascii_lowercase())
        );
        assert!(ContentId::parse(&"a".repeat(64)).is_some());
        assert!(ContentId::parse("abc123").is_none());
        assert!(ContentId::parse("src/main.rs").is_none());
        assert!(ContentId::parse(&"g".repeat(40)).is_none());
    }

    #[test]
    fn author_entry_tracks_bounds_out_of_order() {
        let mut entry = AuthorEntry::default();
        entry.record_commit(200, "1970-01-01".into());
        entry.record_commit(100, "1970-01-01".into());
        entry.record_commit(90_000, "1970-01-02".into());
        assert_eq!(entry.commit_count, 3);
        assert_eq!(entry.first_commit_timestamp, Some(100));
        assert_eq!(entry.last_commit_timestamp, Some(90_000));
        assert_eq!(entry.active_days.len(), 2);
    }
}
