use crate::{
    bucket_digest::BucketDigest,
    config::DigestConfig,
    quantize::Quantizer,
    store::{CounterPage, PAGE_SLOTS},
};

/// One native `u64` counter per bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidePage {
    counts: Box<[u64; PAGE_SLOTS]>,
}

impl CounterPage for WidePage {
    type Layout = ();

    fn zeroed(_layout: ()) -> Self {
        Self {
            counts: Box::new([0; PAGE_SLOTS]),
        }
    }

    fn get(&self, _layout: (), slot: usize) -> u64 {
        self.counts[slot]
    }

    fn add(&mut self, _layout: (), slot: usize, n: u64) -> u64 {
        let counter = &mut self.counts[slot];
        let before = *counter;
        *counter = before.saturating_add(n);
        *counter - before
    }

    fn max_count(_layout: ()) -> u64 {
        u64::MAX
    }

    fn heap_size(&self) -> usize {
        size_of::<[u64; PAGE_SLOTS]>()
    }
}

/// Low precision digest: few buckets per binade, direct-indexed native counters.
pub type UnpackedDigest = BucketDigest<WidePage>;

impl UnpackedDigest {
    pub fn new(precision: u8, config: &DigestConfig) -> Self {
        Self::with_layout(Quantizer::new(precision), config, ())
    }
}
