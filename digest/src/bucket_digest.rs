use std::collections::BTreeMap;

use crate::{
    config::DigestConfig,
    error::DigestError,
    quantize::Quantizer,
    store::{CounterPage, PAGE_SLOTS, page_address, page_base_key},
};

/// Histogram of quantized values stored in pages of [`PAGE_SLOTS`] counters.
///
/// Only pages holding at least one observation are allocated, and at most `max_pages` of them.
/// When one more page would be needed, the whole digest drops one mantissa bit: every bucket is
/// re-keyed into the coarser quantizer and adjacent buckets add up. The resolution kept is the
/// finest one whose pages fit, whatever the insertion or merge order. Once a bucket spans a
/// whole binade no further coarsening happens; at that resolution any data fits in 64 pages.
///
/// `count == stored_count() + saturated` holds at all times. `saturated` only grows when a
/// counter cannot represent a count, and every bucket that lost counts sits at
/// [`Self::max_bucket_count`].
#[derive(Debug, Clone)]
pub struct BucketDigest<P: CounterPage> {
    quantizer: Quantizer,
    layout: P::Layout,
    max_pages: usize,
    pages: BTreeMap<i64, P>,
    count: u64,
    saturated: u64,
    min: f64,
    max: f64,
}

impl<P: CounterPage> BucketDigest<P> {
    pub fn with_layout(quantizer: Quantizer, config: &DigestConfig, layout: P::Layout) -> Self {
        Self {
            quantizer,
            layout,
            max_pages: config.max_buckets.div_ceil(PAGE_SLOTS).max(1),
            pages: BTreeMap::new(),
            count: 0,
            saturated: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Current quantizer, coarser than the precision asks for when the digest ran out of pages.
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn precision(&self) -> u8 {
        self.quantizer.precision()
    }

    /// Bucket capacity, rounded up to whole pages.
    pub fn max_buckets(&self) -> usize {
        self.max_pages * PAGE_SLOTS
    }

    /// Number of values absorbed, including the ones lost to counter saturation.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all bucket counters.
    pub fn stored_count(&self) -> u64 {
        self.count - self.saturated
    }

    pub fn saturated(&self) -> u64 {
        self.saturated
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    /// Largest count a bucket can hold before saturating.
    pub fn max_bucket_count(&self) -> u64 {
        P::max_count(self.layout)
    }

    /// Bytes held by counter pages.
    pub fn heap_size(&self) -> usize {
        self.pages.values().map(CounterPage::heap_size).sum()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Counter of the bucket holding `value`, zero when the bucket was never hit.
    pub fn bucket_count(&self, value: f64) -> u64 {
        if !value.is_finite() {
            return 0;
        }
        let (page_index, slot) = page_address(self.quantizer.key(value));
        self.pages
            .get(&page_index)
            .map_or(0, |page| page.get(self.layout, slot))
    }

    /// Non-empty buckets as `(key, count)` in ascending key order.
    pub fn buckets(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        iter_buckets(&self.pages, self.layout)
    }

    /// Records one observation. Non-finite values are rejected and leave the digest untouched.
    pub fn insert(&mut self, value: f64) -> bool {
        self.insert_n(value, 1)
    }

    /// Records `n` observations of the same value.
    pub fn insert_n(&mut self, value: f64, n: u64) -> bool {
        if !value.is_finite() {
            return false;
        }
        if n == 0 {
            return true;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let key = self.quantizer.key(value);
        self.add_to_bucket(key, n);
        true
    }

    /// Adds `n` observations to a bucket of the current quantizer without touching min and max.
    pub fn add_to_bucket(&mut self, key: i64, n: u64) {
        let stored = self.store(key, n);
        self.count += n;
        self.saturated += n - stored;
        self.enforce_page_limit();
    }

    /// Rebuilds a digest from its parts, as produced by [`Self::buckets`] under `quantizer`.
    ///
    /// The parts come from outside the process: keys must be valid for `quantizer`, counts must
    /// fit the counters, and the totals must not overflow.
    pub fn restore(
        &mut self,
        quantizer: Quantizer,
        bounds: Option<(f64, f64)>,
        saturated: u64,
        buckets: impl IntoIterator<Item = (i64, u64)>,
    ) -> Result<(), DigestError> {
        if quantizer.precision() != self.precision()
            || quantizer.resolution_bits() > self.quantizer.resolution_bits()
        {
            return Err(DigestError::Decode(format!(
                "resolution of {} bits is finer than precision {} allows",
                quantizer.resolution_bits(),
                self.precision()
            )));
        }
        self.rekey(quantizer);
        let max_count = self.max_bucket_count();
        let mut count = saturated;
        let mut has_full_bucket = false;
        for (key, n) in buckets {
            if !quantizer.is_valid_key(key) || n > max_count {
                return Err(DigestError::Decode(format!("invalid bucket {key}: {n}")));
            }
            if n == 0 {
                continue;
            }
            count = count
                .checked_add(n)
                .ok_or_else(|| DigestError::Decode("bucket counts overflow".into()))?;
            has_full_bucket |= n == max_count;
            // the digest may have coarsened past `quantizer` while restoring
            let key = quantizer.rekey(key, &self.quantizer);
            self.add_to_bucket(key, n);
        }
        if saturated > 0 && !has_full_bucket {
            return Err(DigestError::Decode(format!(
                "{saturated} saturated observations without a full bucket"
            )));
        }
        match bounds {
            Some((min, max)) if count > 0 => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(DigestError::Decode(format!("invalid bounds [{min}, {max}]")));
                }
                self.min = min;
                self.max = max;
            }
            None if count == 0 => {}
            _ => {
                return Err(DigestError::Decode(
                    "bounds must be present exactly when the digest is not empty".into(),
                ));
            }
        }
        self.count += saturated;
        self.saturated += saturated;
        Ok(())
    }

    /// Adds every bucket of `other` into `self`, slot by slot, saturating per counter. The
    /// result keeps the coarser of the two resolutions, or coarser still if the union does not
    /// fit.
    pub fn merge(&mut self, other: &Self) -> Result<(), DigestError> {
        if self.quantizer.precision() != other.quantizer.precision()
            || self.layout != other.layout
            || self.max_pages != other.max_pages
        {
            return Err(DigestError::IncompatibleMerge(format!(
                "precision {} with {} buckets vs precision {} with {} buckets",
                self.precision(),
                self.max_buckets(),
                other.precision(),
                other.max_buckets()
            )));
        }
        if other.is_empty() {
            return Ok(());
        }
        let count = self
            .count
            .checked_add(other.count)
            .ok_or(DigestError::CountOverflow)?;
        if other.quantizer.resolution_bits() < self.quantizer.resolution_bits() {
            self.rekey(other.quantizer);
        }
        let mut lost = 0;
        for (key, n) in other.buckets() {
            let key = other.quantizer.rekey(key, &self.quantizer);
            lost += n - self.store(key, n);
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
        self.saturated += other.saturated + lost;
        self.enforce_page_limit();
        Ok(())
    }

    /// Adds `n` to the counter of `key` and returns how much was stored.
    fn store(&mut self, key: i64, n: u64) -> u64 {
        let (page_index, slot) = page_address(key);
        let layout = self.layout;
        self.pages
            .entry(page_index)
            .or_insert_with(|| P::zeroed(layout))
            .add(layout, slot, n)
    }

    fn enforce_page_limit(&mut self) {
        while self.pages.len() > self.max_pages {
            let Some(coarser) = self.quantizer.coarsen() else {
                return;
            };
            self.rekey(coarser);
        }
    }

    /// Moves every bucket into `coarser`. Counts lost to saturation while adjacent buckets add
    /// up are accounted for in `saturated`.
    fn rekey(&mut self, coarser: Quantizer) {
        if coarser == self.quantizer {
            return;
        }
        let pages = std::mem::take(&mut self.pages);
        let finer = std::mem::replace(&mut self.quantizer, coarser);
        for (key, n) in iter_buckets(&pages, self.layout) {
            let stored = self.store(finer.rekey(key, &coarser), n);
            self.saturated += n - stored;
        }
    }
}

fn iter_buckets<P: CounterPage>(
    pages: &BTreeMap<i64, P>,
    layout: P::Layout,
) -> impl Iterator<Item = (i64, u64)> + '_ {
    pages.iter().flat_map(move |(page_index, page)| {
        (0..PAGE_SLOTS).filter_map(move |slot| {
            let n = page.get(layout, slot);
            (n > 0).then_some((page_base_key(*page_index) + slot as i64, n))
        })
    })
}

/// Digests are equal when they describe the same distribution.
impl<P: CounterPage> PartialEq for BucketDigest<P> {
    fn eq(&self, other: &Self) -> bool {
        self.quantizer == other.quantizer
            && self.layout == other.layout
            && self.count == other.count
            && self.saturated == other.saturated
            && self.min() == other.min()
            && self.max() == other.max()
            && self.buckets().eq(other.buckets())
    }
}
