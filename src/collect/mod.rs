//! The aggregation engine.
//!
//! [`Aggregates`] is threaded by value through one fold per query. Each fold
//! consumes its records in a defined order on the calling thread; the only
//! parallel work is resolving cache misses, and those results are merged
//! back here after the pool drains.

mod activity;
mod churn;
mod files;
mod histogram;
mod refine;
mod tags;

pub use histogram::Histogram;
pub use refine::Refined;

use crate::cache::CacheStore;
use crate::config::CollectorConfig;
use crate::error::Result;
use crate::git::{Oracle, Walk};
use crate::model::{
    AuthorChurnPoint, AuthorEntry, ChangeRecord, ChurnPoint, DomainEntry, ExtensionEntry,
    TagRecord,
};
use crate::parse::{
    change_records, commit_records, shortlog_lines, tree_entries, tree_revisions, Parsed,
};
use crate::resolve::FactResolver;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub hour_of_day: Histogram<u32>,
    pub day_of_week: Histogram<u32>,
    pub month_of_year: Histogram<u32>,
    /// `(day-of-week, hour-of-day)`.
    pub hour_of_week: Histogram<(u32, u32)>,
    pub year_week: Histogram<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub total_authors: u64,
    pub total_commits: u64,
    pub first_commit_stamp: Option<i64>,
    pub last_commit_stamp: Option<i64>,
    pub activity: Activity,
    pub authors: BTreeMap<String, AuthorEntry>,
    pub domains: BTreeMap<String, DomainEntry>,
    pub author_of_month: BTreeMap<String, BTreeMap<String, u64>>,
    pub commits_by_month: BTreeMap<String, u64>,
    pub author_of_year: BTreeMap<i32, BTreeMap<String, u64>>,
    pub commits_by_year: BTreeMap<i32, u64>,
    pub active_days: BTreeSet<String>,
    pub commits_by_timezone: BTreeMap<String, u64>,
    pub tags: BTreeMap<String, TagRecord>,
    pub files_by_stamp: BTreeMap<i64, u64>,
    pub total_files: u64,
    pub total_size: u64,
    pub extensions: BTreeMap<String, ExtensionEntry>,
    pub changes_by_date: BTreeMap<i64, ChurnPoint>,
    pub changes_by_date_by_author: BTreeMap<i64, BTreeMap<String, AuthorChurnPoint>>,
    pub lines_added_by_month: BTreeMap<String, u64>,
    pub lines_removed_by_month: BTreeMap<String, u64>,
    pub lines_added_by_year: BTreeMap<i32, u64>,
    pub lines_removed_by_year: BTreeMap<i32, u64>,
    pub total_lines: i64,
    pub total_lines_added: u64,
    pub total_lines_removed: u64,
    pub warnings: Vec<String>,
}

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unwraps a parsed line, logging and recording any anomaly.
    pub(crate) fn accept<T>(&mut self, parsed: Parsed<T>) -> Option<T> {
        let (record, anomaly) = parsed.into_parts();
        if let Some(anomaly) = anomaly {
            warn!(%anomaly, "unexpected line");
            self.warnings.push(anomaly.to_string());
        }
        record
    }

    pub(crate) fn accept_all<T>(&mut self, parsed: impl IntoIterator<Item = Parsed<T>>) -> Vec<T> {
        parsed
            .into_iter()
            .filter_map(|line| self.accept(line))
            .collect()
    }

    /// `log --shortstat` lists newest first; churn folds want oldest first.
    fn oldest_first(&mut self, text: &str) -> Vec<ChangeRecord> {
        let mut records = self.accept_all(change_records(text));
        records.reverse();
        records
    }

    pub fn fold_total_authors<I>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = Parsed<crate::model::ShortlogLine>>,
    {
        self.total_authors = self.accept_all(lines).len() as u64;
        self
    }
}

/// Runs every query against `oracle` and folds the answers into one
/// [`Aggregates`]. `cache` is consulted before and extended after each
/// expensive phase.
pub fn collect<O: Oracle>(
    oracle: &O,
    cache: &mut CacheStore,
    resolver: &FactResolver,
    config: &CollectorConfig,
) -> Result<Aggregates> {
    let range = config.log_range();
    let mut stats = Aggregates::new();

    info!("counting authors");
    let shortlog = oracle.shortlog(&range.args())?;
    stats = stats.fold_total_authors(shortlog_lines(&shortlog));

    info!("collecting tags");
    let refs = oracle.tag_refs()?;
    stats = stats.fold_tag_refs(&refs, |revision| oracle.revision_header(revision))?;
    stats = stats.fold_tag_deltas(|revisions| oracle.shortlog(revisions))?;

    info!("collecting commit activity");
    let log = oracle.commit_log(&range)?;
    stats = stats.fold_commits(commit_records(&log));

    info!("collecting files per revision");
    let log = oracle.tree_log(&range)?;
    let revisions = stats.accept_all(tree_revisions(&log));
    let part = cache
        .revision_to_file_count
        .partition(revisions.into_iter().map(|rev| (rev.timestamp, rev.tree_id)));
    let resolved = resolver.resolve_tree_file_counts(oracle, part.misses)?;
    cache
        .revision_to_file_count
        .merge(resolved.iter().map(|(_, key, files)| (key.clone(), *files)));
    stats = stats.fold_file_counts(part.hits.into_iter().chain(resolved));

    info!("collecting extensions");
    let listing = oracle.tree_listing(&config.tip())?;
    let entries = stats.accept_all(tree_entries(&listing));
    let (next, blobs) = stats.fold_tree_entries(entries, config.max_ext_length);
    stats = next;
    let part = cache.blob_to_line_count.partition(blobs);
    let resolved = resolver.resolve_blob_line_counts(oracle, part.misses)?;
    cache
        .blob_to_line_count
        .merge(resolved.iter().map(|(_, key, lines)| (key.clone(), *lines)));
    stats = stats.fold_blob_lines(part.hits.into_iter().chain(resolved));

    info!("collecting line statistics");
    let walk = if config.linear_linestats {
        Walk::Mainline
    } else {
        Walk::Full
    };
    let log = oracle.shortstat_log(&range, walk)?;
    let records = stats.oldest_first(&log);
    stats = stats.fold_mainline_churn(records);

    let log = oracle.shortstat_log(&range, Walk::Full)?;
    let records = stats.oldest_first(&log);
    stats = stats.fold_author_churn(records);

    info!(
        commits = stats.total_commits,
        authors = stats.authors.len(),
        warnings = stats.warnings.len(),
        "collection finished"
    );
    Ok(stats)
}

/// Loads the cache at `cache_path`, collects, persists the cache, and
/// refines the result.
pub fn run<O: Oracle>(oracle: &O, cache_path: &Path, config: &CollectorConfig) -> Result<Refined> {
    let mut cache = CacheStore::load(cache_path);
    let resolver = FactResolver::new(config.processes, config.progress)?;
    let stats = collect(oracle, &mut cache, &resolver, config)?;
    if let Err(err) = cache.save(cache_path) {
        warn!(path = %cache_path.display(), error = %err, "failed to persist cache");
    }
    Ok(stats.refine())
}
