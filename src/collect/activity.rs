use super::Aggregates;
use crate::model::CommitRecord;
use crate::parse::Parsed;
use crate::util::{domain_of, Moment};

impl Aggregates {
    /// Temporal histograms, author ledger, domains and calendar tables from
    /// the activity log. History order is not chronological, so bounds are
    /// taken as min/max rather than first/last seen.
    pub fn fold_commits<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = Parsed<CommitRecord>>,
    {
        for parsed in records {
            if let Some(record) = self.accept(parsed) {
                self.fold_commit(record);
            }
        }
        self
    }

    fn fold_commit(&mut self, record: CommitRecord) {
        let stamp = record.timestamp;
        self.first_commit_stamp = Some(self.first_commit_stamp.map_or(stamp, |s| s.min(stamp)));
        self.last_commit_stamp = Some(self.last_commit_stamp.map_or(stamp, |s| s.max(stamp)));
        self.total_commits += 1;

        let at = Moment::at(stamp);
        let activity = &mut self.activity;
        activity.hour_of_day.increment(at.hour);
        activity.day_of_week.increment(at.weekday);
        activity.hour_of_week.increment((at.weekday, at.hour));
        activity.month_of_year.increment(at.month);
        activity.year_week.increment(at.week_key.clone());

        self.domains
            .entry(domain_of(&record.author_email).to_string())
            .or_default()
            .commits += 1;

        self.authors
            .entry(record.author_name.clone())
            .or_default()
            .record_commit(stamp, at.day.clone());

        *self
            .author_of_month
            .entry(at.month_key.clone())
            .or_default()
            .entry(record.author_name.clone())
            .or_insert(0) += 1;
        *self.commits_by_month.entry(at.month_key).or_insert(0) += 1;

        *self
            .author_of_year
            .entry(at.year)
            .or_default()
            .entry(record.author_name)
            .or_insert(0) += 1;
        *self.commits_by_year.entry(at.year).or_insert(0) += 1;

        self.active_days.insert(at.day);
        *self
            .commits_by_timezone
            .entry(record.timezone_offset)
            .or_insert(0) += 1;
    }
}
