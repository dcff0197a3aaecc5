use std::{collections::HashMap, hash::Hash};

use crate::{factory::ApproxPercentile, percentile_digest::PercentileDigest};

/// Digests of one aggregation shard, keyed by group.
///
/// A table is owned by a single worker until it is handed to [`crate::merge`].
#[derive(Debug, Clone)]
pub struct GroupStateTable<K> {
    function: ApproxPercentile,
    entries: HashMap<K, PercentileDigest>,
    rejected_rows: u64,
}

impl<K: Hash + Eq> GroupStateTable<K> {
    pub fn new(function: ApproxPercentile) -> Self {
        Self {
            function,
            entries: HashMap::new(),
            rejected_rows: 0,
        }
    }

    pub fn function(&self) -> &ApproxPercentile {
        &self.function
    }

    /// Feeds a value to the digest of `key`, creating the digest on first sight.
    /// Returns `false` when the value was not finite and got skipped.
    pub fn route(&mut self, key: K, value: f64) -> bool {
        if !value.is_finite() {
            self.rejected_rows += 1;
            return false;
        }
        let function = &self.function;
        self.entries
            .entry(key)
            .or_insert_with(|| function.new_digest())
            .insert(value)
    }

    pub fn get(&self, key: &K) -> Option<&PercentileDigest> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows skipped because their value was not finite.
    pub fn rejected_rows(&self) -> u64 {
        self.rejected_rows
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &PercentileDigest)> {
        self.entries.iter()
    }

    pub fn heap_size(&self) -> usize {
        self.entries
            .values()
            .map(|digest| size_of_val(digest) + digest.heap_size())
            .sum()
    }

    /// Final value of every group.
    pub fn finalize(&self) -> Vec<(&K, Option<f64>)> {
        self.entries
            .iter()
            .map(|(key, digest)| (key, self.function.evaluate(digest)))
            .collect()
    }

    pub(crate) fn into_parts(self) -> (ApproxPercentile, HashMap<K, PercentileDigest>, u64) {
        (self.function, self.entries, self.rejected_rows)
    }

    pub(crate) fn from_parts(
        function: ApproxPercentile,
        entries: HashMap<K, PercentileDigest>,
        rejected_rows: u64,
    ) -> Self {
        Self {
            function,
            entries,
            rejected_rows,
        }
    }
}

impl<K: Hash + Eq> IntoIterator for GroupStateTable<K> {
    type Item = (K, PercentileDigest);
    type IntoIter = std::collections::hash_map::IntoIter<K, PercentileDigest>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
