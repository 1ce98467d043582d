//! Typed records out of the raw text the oracle returns.
//!
//! Nothing here fails: a line that does not have its expected shape comes
//! back as [`Parsed::Rejected`], and a well-shaped line with a bad number
//! comes back as [`Parsed::Recovered`] carrying a zero in place of the
//! number. Every iterator borrows its input, so calling the function again
//! restarts the sequence.

use crate::model::{
    ChangeRecord, CommitHeader, CommitRecord, ContentId, RefLine, ShortlogLine, Shortstat,
    TreeEntry, TreeRevision,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::iter::Peekable;

// git indents the shortstat line; headers start with the epoch.
static SHORTSTAT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+\d+ files? changed(,|$)").expect("static regex"));

static SHORTSTAT_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+) (files? changed|insertions?\(\+\)|deletions?\(-\))$")
        .expect("static regex")
});

const SUBMODULE_MODE: &str = "160000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub reason: &'static str,
    pub line: String,
}

impl Anomaly {
    fn new(reason: &'static str, line: &str) -> Self {
        Self {
            reason,
            line: line.to_string(),
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.reason, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Ok(T),
    /// Usable record with a zero substituted for an unparsable number.
    Recovered(T, Anomaly),
    Rejected(Anomaly),
}

impl<T> Parsed<T> {
    pub fn into_parts(self) -> (Option<T>, Option<Anomaly>) {
        match self {
            Parsed::Ok(record) => (Some(record), None),
            Parsed::Recovered(record, anomaly) => (Some(record), Some(anomaly)),
            Parsed::Rejected(anomaly) => (None, Some(anomaly)),
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        match self {
            Parsed::Ok(record) => Parsed::Ok(f(record)),
            Parsed::Recovered(record, anomaly) => Parsed::Recovered(f(record), anomaly),
            Parsed::Rejected(anomaly) => Parsed::Rejected(anomaly),
        }
    }
}

fn text_lines(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.lines().filter(|line| !line.trim().is_empty())
}

fn epoch_or_zero(raw: &str) -> Result<i64, ()> {
    raw.trim().parse::<i64>().map_err(|_| ())
}

/// `<revision-id> refs/tags/<name>` as printed by `show-ref --tags`.
pub fn parse_ref_line(line: &str) -> Parsed<RefLine> {
    match line.trim().split_once(' ') {
        Some((revision_id, name)) if !revision_id.is_empty() && !name.is_empty() => {
            Parsed::Ok(RefLine {
                revision_id: revision_id.to_string(),
                tag: name.strip_prefix("refs/tags/").unwrap_or(name).to_string(),
            })
        }
        _ => Parsed::Rejected(Anomaly::new("unexpected ref line", line)),
    }
}

pub fn ref_lines(text: &str) -> impl Iterator<Item = Parsed<RefLine>> + '_ {
    text_lines(text).map(parse_ref_line)
}

/// `<epoch> <author>`; everything after the first space is the author.
pub fn parse_commit_header(line: &str) -> Result<CommitHeader, Anomaly> {
    let (stamp, author) = line
        .split_once(' ')
        .ok_or_else(|| Anomaly::new("unexpected commit header", line))?;
    let timestamp = stamp
        .parse::<i64>()
        .map_err(|_| Anomaly::new("unexpected commit header", line))?;
    Ok(CommitHeader {
        timestamp,
        author: author.to_string(),
    })
}

/// Single-revision header where the line shape is given by the query, so a
/// bad timestamp is recovered as zero instead of dropping the revision.
pub fn parse_revision_header(line: &str) -> Parsed<CommitHeader> {
    let line = line.trim();
    let (stamp, author) = line.split_once(' ').unwrap_or((line, ""));
    match epoch_or_zero(stamp) {
        Ok(timestamp) => Parsed::Ok(CommitHeader {
            timestamp,
            author: author.to_string(),
        }),
        Err(()) => Parsed::Recovered(
            CommitHeader {
                timestamp: 0,
                author: author.to_string(),
            },
            Anomaly::new("non-numeric revision timestamp", line),
        ),
    }
}

/// `<epoch> <date> <time> <tz> <name> <<email>>` from the activity log.
pub fn parse_commit_record(line: &str) -> Parsed<CommitRecord> {
    let mut parts = line.splitn(5, ' ');
    let (Some(stamp), Some(_date), Some(_time), Some(tz), Some(identity)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Parsed::Rejected(Anomaly::new("unexpected commit line", line));
    };
    let Some((name, email)) = identity.split_once('<') else {
        return Parsed::Rejected(Anomaly::new("commit line without email", line));
    };
    let record = |timestamp| CommitRecord {
        timestamp,
        author_name: name.trim_end().to_string(),
        author_email: email.trim_end().trim_end_matches('>').to_string(),
        timezone_offset: tz.to_string(),
    };
    match epoch_or_zero(stamp) {
        Ok(timestamp) => Parsed::Ok(record(timestamp)),
        Err(()) => Parsed::Recovered(
            record(0),
            Anomaly::new("non-numeric commit timestamp", line),
        ),
    }
}

/// Activity log records; `commit <id>` separator lines are dropped.
pub fn commit_records(text: &str) -> impl Iterator<Item = Parsed<CommitRecord>> + '_ {
    text_lines(text)
        .filter(|line| !line.starts_with("commit "))
        .map(parse_commit_record)
}

pub fn is_shortstat(line: &str) -> bool {
    SHORTSTAT_MARKER.is_match(line)
}

/// ` N files changed, N insertions(+), N deletions(-)`.
///
/// git leaves out a zero insertion or deletion clause, so an absent clause
/// counts as zero. A clause that is present but malformed poisons the line.
pub fn parse_shortstat(line: &str) -> Parsed<Shortstat> {
    let poisoned = || {
        Parsed::Recovered(
            Shortstat::default(),
            Anomaly::new("failed to handle shortstat", line),
        )
    };
    let mut stat = Shortstat::default();
    let mut seen_files = false;
    for (index, clause) in line.trim().split(',').enumerate() {
        let Some(caps) = SHORTSTAT_CLAUSE.captures(clause.trim()) else {
            return poisoned();
        };
        let Ok(count) = caps[1].parse::<u64>() else {
            return poisoned();
        };
        match (&caps[2], index) {
            (kind, 0) if kind.starts_with("file") => {
                stat.files = count;
                seen_files = true;
            }
            (kind, i) if i > 0 && kind.starts_with("insertion") => stat.inserted = count,
            (kind, i) if i > 0 && kind.starts_with("deletion") => stat.deleted = count,
            _ => return poisoned(),
        }
    }
    if seen_files {
        Parsed::Ok(stat)
    } else {
        poisoned()
    }
}

/// Pairs each `<epoch> <author>` header of a `log --shortstat` listing with
/// the shortstat line that follows it. A header without one is a commit that
/// changed nothing.
pub struct ChangeRecords<I: Iterator> {
    lines: Peekable<I>,
}

pub fn change_records<'a>(text: &'a str) -> ChangeRecords<impl Iterator<Item = &'a str> + 'a> {
    ChangeRecords {
        lines: text_lines(text).peekable(),
    }
}

impl<'a, I: Iterator<Item = &'a str>> ChangeRecords<I> {
    fn take_shortstat(&mut self) -> Option<&'a str> {
        self.lines.next_if(|line| is_shortstat(line))
    }
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for ChangeRecords<I> {
    type Item = Parsed<ChangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        if is_shortstat(line) {
            return Some(Parsed::Rejected(Anomaly::new(
                "shortstat without commit header",
                line,
            )));
        }
        let header = match parse_commit_header(line) {
            Ok(header) => header,
            Err(anomaly) => {
                // The orphaned shortstat belongs to the rejected header.
                self.take_shortstat();
                return Some(Parsed::Rejected(anomaly));
            }
        };
        let stat = match self.take_shortstat() {
            Some(stat_line) => parse_shortstat(stat_line),
            None => Parsed::Ok(Shortstat::default()),
        };
        Some(stat.map(|stat| ChangeRecord {
            timestamp: header.timestamp,
            author_name: header.author,
            stat,
        }))
    }
}

/// `   <count>\t<author>` from `shortlog -s`.
pub fn parse_shortlog_line(line: &str) -> Parsed<ShortlogLine> {
    let trimmed = line.trim_start();
    let Some((count, author)) = trimmed.split_once(char::is_whitespace) else {
        return Parsed::Rejected(Anomaly::new("unexpected shortlog line", line));
    };
    match count.parse::<u64>() {
        Ok(commits) => Parsed::Ok(ShortlogLine {
            commits,
            author: author.trim_start().to_string(),
        }),
        Err(_) => Parsed::Rejected(Anomaly::new("unexpected shortlog line", line)),
    }
}

pub fn shortlog_lines(text: &str) -> impl Iterator<Item = Parsed<ShortlogLine>> + '_ {
    text_lines(text).map(parse_shortlog_line)
}

/// `<epoch> <tree-id>` from the revision tree walk.
pub fn parse_tree_revision(line: &str) -> Parsed<TreeRevision> {
    let Some((stamp, tree)) = line.trim().split_once(' ') else {
        return Parsed::Rejected(Anomaly::new("unexpected revision line", line));
    };
    let Some(tree_id) = ContentId::parse(tree.trim()) else {
        return Parsed::Rejected(Anomaly::new("invalid tree id", line));
    };
    match epoch_or_zero(stamp) {
        Ok(timestamp) => Parsed::Ok(TreeRevision { timestamp, tree_id }),
        Err(()) => Parsed::Recovered(
            TreeRevision {
                timestamp: 0,
                tree_id,
            },
            Anomaly::new("non-numeric revision timestamp", line),
        ),
    }
}

pub fn tree_revisions(text: &str) -> impl Iterator<Item = Parsed<TreeRevision>> + '_ {
    text_lines(text)
        .filter(|line| !line.starts_with("commit "))
        .map(parse_tree_revision)
}

/// One `<mode> <type> <id> <size>\t<path>` entry of `ls-tree -r -l -z`.
/// Submodule entries yield `None`.
pub fn parse_tree_entry(entry: &str) -> Option<Parsed<TreeEntry>> {
    let Some((meta, path)) = entry.split_once('\t') else {
        return Some(Parsed::Rejected(Anomaly::new("unexpected tree entry", entry)));
    };
    let mut fields = meta.split_whitespace();
    let (Some(mode), Some(_), Some(id), Some(size), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Some(Parsed::Rejected(Anomaly::new("unexpected tree entry", entry)));
    };
    if mode == SUBMODULE_MODE && size == "-" {
        return None;
    }
    let Some(blob_id) = ContentId::parse(id) else {
        return Some(Parsed::Rejected(Anomaly::new("invalid blob id", entry)));
    };
    let record = |size| TreeEntry {
        blob_id,
        size,
        path: path.to_string(),
    };
    Some(match size.parse::<u64>() {
        Ok(size) => Parsed::Ok(record(size)),
        Err(_) => Parsed::Recovered(record(0), Anomaly::new("non-numeric blob size", entry)),
    })
}

pub fn tree_entries(text: &str) -> impl Iterator<Item = Parsed<TreeEntry>> + '_ {
    text.split('\0')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(parse_tree_entry)
}
