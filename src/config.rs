use std::num::NonZeroUsize;

pub const DEFAULT_MAX_EXT_LENGTH: usize = 10;
pub const DEFAULT_COMMIT_END: &str = "HEAD";

/// Knobs for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Worker count for the expensive per-item queries.
    pub processes: usize,
    pub max_ext_length: usize,
    /// Walk only first parents when building the project-wide churn series.
    pub linear_linestats: bool,
    pub commit_begin: Option<String>,
    pub commit_end: Option<String>,
    pub start_date: Option<String>,
    pub progress: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            processes: default_processes(),
            max_ext_length: DEFAULT_MAX_EXT_LENGTH,
            linear_linestats: true,
            commit_begin: None,
            commit_end: None,
            start_date: None,
            progress: false,
        }
    }
}

pub fn default_processes() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl CollectorConfig {
    pub fn log_range(&self) -> LogRange {
        LogRange {
            revisions: self.commit_range(),
            since: self.start_date.clone(),
        }
    }

    /// Revision whose tree is listed for extension and size statistics.
    pub fn tip(&self) -> String {
        self.commit_end
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMIT_END.to_string())
    }

    fn commit_range(&self) -> Vec<String> {
        let end = self.tip();
        match &self.commit_begin {
            Some(begin) => vec![format!("{begin}..{end}")],
            None => vec![end],
        }
    }
}

/// Revision arguments shared by every history query of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRange {
    pub revisions: Vec<String>,
    pub since: Option<String>,
}

impl LogRange {
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.revisions.len() + 1);
        if let Some(since) = &self.since {
            args.push(format!("--since={since}"));
        }
        args.extend(self.revisions.iter().cloned());
        args
    }
}
