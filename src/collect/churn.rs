use super::Aggregates;
use crate::model::{AuthorChurnPoint, ChangeRecord, ChurnPoint};
use crate::util::Moment;
use std::collections::BTreeMap;

impl Aggregates {
    /// Project-wide churn from the mainline walk. `records` must be oldest
    /// first; each point carries the commit's own stat and the running
    /// totals up to and including it.
    pub fn fold_mainline_churn(mut self, records: Vec<ChangeRecord>) -> Self {
        let mut total_inserted = 0u64;
        let mut total_deleted = 0u64;
        for record in records {
            let stat = record.stat;
            total_inserted += stat.inserted;
            total_deleted += stat.deleted;
            self.total_lines += stat.inserted as i64 - stat.deleted as i64;
            self.changes_by_date.insert(
                record.timestamp,
                ChurnPoint {
                    files: stat.files,
                    inserted: stat.inserted,
                    deleted: stat.deleted,
                    total_inserted,
                    total_deleted,
                    lines: self.total_lines,
                },
            );

            let at = Moment::at(record.timestamp);
            *self
                .lines_added_by_month
                .entry(at.month_key.clone())
                .or_insert(0) += stat.inserted;
            *self.lines_removed_by_month.entry(at.month_key).or_insert(0) += stat.deleted;
            *self.lines_added_by_year.entry(at.year).or_insert(0) += stat.inserted;
            *self.lines_removed_by_year.entry(at.year).or_insert(0) += stat.deleted;
        }
        self.total_lines_added += total_inserted;
        self.total_lines_removed += total_deleted;
        self
    }

    /// Per-author churn from the full walk, oldest first. A timestamp that
    /// goes backwards is replaced by the latest one seen so the series
    /// never regresses.
    pub fn fold_author_churn(mut self, records: Vec<ChangeRecord>) -> Self {
        let mut running: BTreeMap<String, AuthorChurnPoint> = BTreeMap::new();
        let mut latest: Option<i64> = None;
        for record in records {
            let stamp = latest.map_or(record.timestamp, |seen| seen.max(record.timestamp));
            latest = Some(stamp);

            let author = self.authors.entry(record.author_name.clone()).or_default();
            author.lines_added += record.stat.inserted;
            author.lines_removed += record.stat.deleted;

            let point = running.entry(record.author_name.clone()).or_default();
            point.lines_added += record.stat.inserted;
            point.commits += 1;
            self.changes_by_date_by_author
                .entry(stamp)
                .or_default()
                .insert(record.author_name, *point);
        }
        self
    }
}
