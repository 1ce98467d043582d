use chrono::{DateTime, Datelike, Timelike, Utc};

/// Calendar coordinates of one commit timestamp, in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moment {
    pub hour: u32,
    /// Monday = 0.
    pub weekday: u32,
    pub month: u32,
    pub year: i32,
    pub day: String,
    pub month_key: String,
    pub week_key: String,
}

pub fn datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

pub fn day_key(timestamp: i64) -> String {
    datetime(timestamp).format("%Y-%m-%d").to_string()
}

pub fn week_key(timestamp: &DateTime<Utc>) -> String {
    let week = timestamp.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

impl Moment {
    pub fn at(timestamp: i64) -> Self {
        let dt = datetime(timestamp);
        Self {
            hour: dt.hour(),
            weekday: dt.weekday().num_days_from_monday(),
            month: dt.month(),
            year: dt.year(),
            day: dt.format("%Y-%m-%d").to_string(),
            month_key: dt.format("%Y-%m").to_string(),
            week_key: week_key(&dt),
        }
    }
}

/// Extension bucket for a path: empty for extensionless names, dotfiles,
/// and anything longer than `max_len`.
pub fn extension_of(path: &str, max_len: usize) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        None | Some(0) => "",
        Some(pos) => {
            let ext = &name[pos + 1..];
            if ext.chars().count() > max_len {
                ""
            } else {
                ext
            }
        }
    }
}

/// Domain part of an email address, `?` when there is none.
pub fn domain_of(email: &str) -> &str {
    email.rsplit_once('@').map_or("?", |(_, domain)| domain)
}
