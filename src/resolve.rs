use crate::error::{Result, StatsError};
use crate::git::Oracle;
use crate::model::ContentId;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Bounded pool for the expensive one-object-at-a-time oracle queries.
///
/// Workers only compute; every result is handed back to the caller once the
/// pool has drained, and merging into the cache happens on the calling
/// thread.
pub struct FactResolver {
    pool: ThreadPool,
    progress: bool,
}

impl FactResolver {
    pub fn new(workers: usize, progress: bool) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("gitstats-resolve-{i}"))
            .build()?;
        Ok(Self { pool, progress })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `query` once per distinct key and returns one `(context, key,
    /// fact)` per input. A key whose query fails is retried once on this
    /// thread; a second failure aborts.
    pub fn resolve<C, F, Q>(
        &self,
        label: &str,
        items: Vec<(C, ContentId)>,
        query: Q,
    ) -> Result<Vec<(C, ContentId, F)>>
    where
        F: Copy + Send,
        Q: Fn(&ContentId) -> Result<F> + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let unique: Vec<ContentId> = items
            .iter()
            .map(|(_, key)| key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        info!(
            label,
            items = items.len(),
            distinct = unique.len(),
            workers = self.workers(),
            "resolving cache misses"
        );

        let bar = self.progress_bar(label, unique.len());
        let attempts: Vec<(ContentId, Result<F>)> = self.pool.install(|| {
            unique
                .into_par_iter()
                .progress_with(bar.clone())
                .map(|key| {
                    let attempt = query(&key);
                    (key, attempt)
                })
                .collect()
        });
        bar.finish_and_clear();

        let mut facts = BTreeMap::new();
        for (key, attempt) in attempts {
            let fact = match attempt {
                Ok(fact) => fact,
                Err(first) => {
                    warn!(label, key = %key, error = %first, "query failed, retrying");
                    query(&key).map_err(|source| StatsError::Resolve {
                        key: key.to_string(),
                        source: Box::new(source),
                    })?
                }
            };
            facts.insert(key, fact);
        }

        items
            .into_iter()
            .map(|(context, key)| match facts.get(&key) {
                Some(fact) => Ok((context, key, *fact)),
                None => Err(StatsError::Parse(format!("no fact resolved for {key}"))),
            })
            .collect()
    }

    /// `(commit timestamp, tree id) -> files in tree`.
    pub fn resolve_tree_file_counts<O: Oracle>(
        &self,
        oracle: &O,
        misses: Vec<(i64, ContentId)>,
    ) -> Result<Vec<(i64, ContentId, u64)>> {
        self.resolve("tree files", misses, |tree| oracle.count_files_in_tree(tree))
    }

    /// `(extension, blob id) -> lines in blob`.
    pub fn resolve_blob_line_counts<O: Oracle>(
        &self,
        oracle: &O,
        misses: Vec<(String, ContentId)>,
    ) -> Result<Vec<(String, ContentId, u64)>> {
        self.resolve("blob lines", misses, |blob| oracle.count_lines_in_blob(blob))
    }

    fn progress_bar(&self, label: &str, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(label.to_string());
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn id(n: u8) -> ContentId {
        ContentId::parse(&format!("{n:02x}").repeat(20)).unwrap()
    }

    #[test]
    fn every_input_gets_one_output() {
        let resolver = FactResolver::new(3, false).unwrap();
        let calls = AtomicUsize::new(0);
        let items = vec![("a", id(1)), ("b", id(2)), ("c", id(1)), ("d", id(3))];
        let mut out = resolver
            .resolve("test", items, |key| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(key.as_str().len() as u64 + 1)
            })
            .unwrap();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].0, "a");
        assert_eq!(out[2].1, id(1));
        assert!(out.iter().all(|(_, _, fact)| *fact == 41));
        // Duplicate keys are queried once.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_input_skips_the_pool() {
        let resolver = FactResolver::new(1, false).unwrap();
        let out: Vec<((), ContentId, u64)> = resolver
            .resolve("test", Vec::new(), |_| panic!("no query expected"))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn transient_failure_is_retried_once() {
        let resolver = FactResolver::new(2, false).unwrap();
        let failed: Mutex<HashSet<ContentId>> = Mutex::new(HashSet::new());
        let out = resolver
            .resolve("test", vec![(0, id(7))], |key| {
                if failed.lock().unwrap().insert(key.clone()) {
                    Err(StatsError::Parse("flaky".into()))
                } else {
                    Ok(5u64)
                }
            })
            .unwrap();
        assert_eq!(out, vec![(0, id(7), 5)]);
    }

    #[test]
    fn persistent_failure_aborts() {
        let resolver = FactResolver::new(2, false).unwrap();
        let err = resolver
            .resolve("test", vec![(0, id(9))], |_| -> Result<u64> {
                Err(StatsError::Parse("broken".into()))
            })
            .unwrap_err();
        assert!(matches!(err, StatsError::Resolve { .. }));
    }
}
