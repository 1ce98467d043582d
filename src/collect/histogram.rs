use std::collections::BTreeMap;

/// Counter family that knows its busiest bucket without a second pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram<K: Ord> {
    counts: BTreeMap<K, u64>,
    busiest: u64,
    busiest_bucket: Option<K>,
}

impl<K: Ord> Default for Histogram<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
            busiest: 0,
            busiest_bucket: None,
        }
    }
}

impl<K: Ord + Clone> Histogram<K> {
    /// Returns the bucket's new count. Ties keep the bucket that got there
    /// first.
    pub fn increment(&mut self, key: K) -> u64 {
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        if count > self.busiest {
            self.busiest = count;
            self.busiest_bucket = Some(key);
        }
        count
    }

    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn busiest(&self) -> u64 {
        self.busiest
    }

    pub fn busiest_bucket(&self) -> Option<&K> {
        self.busiest_bucket.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.counts.iter().map(|(key, count)| (key, *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busiest_matches_max() {
        let mut h = Histogram::default();
        for key in [3u32, 5, 3, 7, 5, 5, 1] {
            h.increment(key);
        }
        let max = h.iter().map(|(_, c)| c).max().unwrap();
        assert_eq!(h.busiest(), max);
        assert_eq!(h.busiest_bucket(), Some(&5));
        assert_eq!(h.get(&3), 2);
        assert_eq!(h.get(&9), 0);
        assert_eq!(h.iter().map(|(_, c)| c).sum::<u64>(), 7);
    }

    #[test]
    fn ties_keep_earliest_bucket() {
        let mut h = Histogram::default();
        h.increment("b");
        h.increment("a");
        h.increment("a");
        h.increment("b");
        assert_eq!(h.busiest(), 2);
        assert_eq!(h.busiest_bucket(), Some(&"a"));
    }
}
