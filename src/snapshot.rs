//! Order-stable JSON rendering of a refined collection.

use crate::collect::{Histogram, Refined};
use crate::error::Result;
use crate::model::{
    AuthorChurnPoint, AuthorEntry, ChurnPoint, DomainEntry, ExtensionEntry, TagRecord,
    SCHEMA_VERSION,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Serialize)]
pub struct HistogramSnapshot<K: Ord> {
    pub counts: BTreeMap<K, u64>,
    pub busiest: u64,
    pub busiest_bucket: Option<K>,
}

impl<K: Ord + Clone> From<&Histogram<K>> for HistogramSnapshot<K> {
    fn from(histogram: &Histogram<K>) -> Self {
        Self {
            counts: histogram.iter().map(|(k, c)| (k.clone(), c)).collect(),
            busiest: histogram.busiest(),
            busiest_bucket: histogram.busiest_bucket().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivitySnapshot {
    pub hour_of_day: HistogramSnapshot<u32>,
    pub day_of_week: HistogramSnapshot<u32>,
    pub month_of_year: HistogramSnapshot<u32>,
    /// day-of-week -> hour -> commits.
    pub hour_of_week: BTreeMap<u32, BTreeMap<u32, u64>>,
    pub hour_of_week_busiest: u64,
    /// `[day-of-week, hour]`.
    pub hour_of_week_busiest_bucket: Option<(u32, u32)>,
    pub year_week: HistogramSnapshot<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorSnapshot<'a> {
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub first_commit_timestamp: Option<i64>,
    pub last_commit_timestamp: Option<i64>,
    pub active_days: &'a BTreeSet<String>,
    pub rank_by_commits: Option<usize>,
    pub commit_share: Option<f64>,
    pub date_first: Option<&'a str>,
    pub date_last: Option<&'a str>,
    pub tenure: Option<String>,
}

impl<'a> From<&'a AuthorEntry> for AuthorSnapshot<'a> {
    fn from(entry: &'a AuthorEntry) -> Self {
        let refined = entry.refined.as_ref();
        Self {
            commit_count: entry.commit_count,
            lines_added: entry.lines_added,
            lines_removed: entry.lines_removed,
            first_commit_timestamp: entry.first_commit_timestamp,
            last_commit_timestamp: entry.last_commit_timestamp,
            active_days: &entry.active_days,
            rank_by_commits: refined.map(|r| r.rank_by_commits),
            commit_share: refined.map(|r| r.commit_share),
            date_first: refined.and_then(|r| r.date_first.as_deref()),
            date_last: refined.and_then(|r| r.date_last.as_deref()),
            tenure: refined
                .and_then(|r| r.tenure)
                .map(|t| humantime::format_duration(t).to_string()),
        }
    }
}

/// Every table of the collection under one document. Map keys are sorted
/// so two runs over the same history serialize identically apart from
/// `generated_at`.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub total_authors: u64,
    pub total_commits: u64,
    pub first_commit_stamp: Option<i64>,
    pub last_commit_stamp: Option<i64>,
    pub last_active_day: Option<&'a str>,
    pub activity: ActivitySnapshot,
    pub authors: BTreeMap<&'a str, AuthorSnapshot<'a>>,
    pub authors_by_commits: &'a [String],
    pub domains: &'a BTreeMap<String, DomainEntry>,
    pub author_of_month: &'a BTreeMap<String, BTreeMap<String, u64>>,
    pub commits_by_month: &'a BTreeMap<String, u64>,
    pub author_of_year: &'a BTreeMap<i32, BTreeMap<String, u64>>,
    pub commits_by_year: &'a BTreeMap<i32, u64>,
    pub active_days: &'a BTreeSet<String>,
    pub commits_by_timezone: &'a BTreeMap<String, u64>,
    pub tags: &'a BTreeMap<String, TagRecord>,
    pub files_by_stamp: &'a BTreeMap<i64, u64>,
    pub total_files: u64,
    pub total_size: u64,
    pub extensions: &'a BTreeMap<String, ExtensionEntry>,
    pub changes_by_date: &'a BTreeMap<i64, ChurnPoint>,
    pub changes_by_date_by_author: &'a BTreeMap<i64, BTreeMap<String, AuthorChurnPoint>>,
    pub lines_added_by_month: &'a BTreeMap<String, u64>,
    pub lines_removed_by_month: &'a BTreeMap<String, u64>,
    pub lines_added_by_year: &'a BTreeMap<i32, u64>,
    pub lines_removed_by_year: &'a BTreeMap<i32, u64>,
    pub total_lines: i64,
    pub total_lines_added: u64,
    pub total_lines_removed: u64,
    pub warnings: &'a [String],
}

impl<'a> Snapshot<'a> {
    pub fn from_refined(refined: &'a Refined, generated_at: DateTime<Utc>) -> Self {
        let stats = refined.aggregates();
        let activity = &stats.activity;

        let mut hour_of_week: BTreeMap<u32, BTreeMap<u32, u64>> = BTreeMap::new();
        for (&(day, hour), count) in activity.hour_of_week.iter() {
            hour_of_week.entry(day).or_default().insert(hour, count);
        }

        Self {
            schema_version: SCHEMA_VERSION,
            generated_at,
            total_authors: stats.total_authors,
            total_commits: stats.total_commits,
            first_commit_stamp: stats.first_commit_stamp,
            last_commit_stamp: stats.last_commit_stamp,
            last_active_day: refined.last_active_day(),
            activity: ActivitySnapshot {
                hour_of_day: (&activity.hour_of_day).into(),
                day_of_week: (&activity.day_of_week).into(),
                month_of_year: (&activity.month_of_year).into(),
                hour_of_week,
                hour_of_week_busiest: activity.hour_of_week.busiest(),
                hour_of_week_busiest_bucket: activity.hour_of_week.busiest_bucket().copied(),
                year_week: (&activity.year_week).into(),
            },
            authors: stats
                .authors
                .iter()
                .map(|(name, entry)| (name.as_str(), entry.into()))
                .collect(),
            authors_by_commits: refined.authors_by_commits(),
            domains: &stats.domains,
            author_of_month: &stats.author_of_month,
            commits_by_month: &stats.commits_by_month,
            author_of_year: &stats.author_of_year,
            commits_by_year: &stats.commits_by_year,
            active_days: &stats.active_days,
            commits_by_timezone: &stats.commits_by_timezone,
            tags: &stats.tags,
            files_by_stamp: &stats.files_by_stamp,
            total_files: stats.total_files,
            total_size: stats.total_size,
            extensions: &stats.extensions,
            changes_by_date: &stats.changes_by_date,
            changes_by_date_by_author: &stats.changes_by_date_by_author,
            lines_added_by_month: &stats.lines_added_by_month,
            lines_removed_by_month: &stats.lines_removed_by_month,
            lines_added_by_year: &stats.lines_added_by_year,
            lines_removed_by_year: &stats.lines_removed_by_year,
            total_lines: stats.total_lines,
            total_lines_added: stats.total_lines_added,
            total_lines_removed: stats.total_lines_removed,
            warnings: &stats.warnings,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
