use crate::{
    bitfield::{add_field_saturating, extract_field, field_max},
    bucket_digest::BucketDigest,
    config::DigestConfig,
    quantize::Quantizer,
    store::{CounterPage, PAGE_SLOTS},
};

/// Width in bits of a packed counter, shared by every packed precision.
///
/// Divides 64 so that a counter never straddles two words, and is wide enough that a bucket only
/// saturates after billions of equal rows.
pub const COUNTER_WIDTH: u32 = 32;

/// [`PAGE_SLOTS`] counters of `width` bits stored side by side in `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPage {
    words: Box<[u64]>,
}

impl PackedPage {
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

fn counters_per_word(width: u32) -> usize {
    (u64::BITS / width) as usize
}

/// Word index and bit shift of a slot.
fn locate(width: u32, slot: usize) -> (usize, u32) {
    let per_word = counters_per_word(width);
    (slot / per_word, (slot % per_word) as u32 * width)
}

impl CounterPage for PackedPage {
    /// Counter width in bits.
    type Layout = u32;

    fn zeroed(width: u32) -> Self {
        debug_assert!(width > 0 && u64::BITS % width == 0);
        let nb_words = PAGE_SLOTS.div_ceil(counters_per_word(width));
        Self {
            words: vec![0; nb_words].into_boxed_slice(),
        }
    }

    fn get(&self, width: u32, slot: usize) -> u64 {
        let (index, shift) = locate(width, slot);
        extract_field(self.words[index], shift, width)
    }

    fn add(&mut self, width: u32, slot: usize, n: u64) -> u64 {
        let (index, shift) = locate(width, slot);
        let (word, added) = add_field_saturating(self.words[index], shift, width, n);
        self.words[index] = word;
        added
    }

    fn max_count(width: u32) -> u64 {
        field_max(width)
    }

    fn heap_size(&self) -> usize {
        self.words.len() * size_of::<u64>()
    }
}

/// High precision digest: many buckets per binade, counters packed into shared words.
pub type PackedDigest = BucketDigest<PackedPage>;

impl PackedDigest {
    pub fn new(precision: u8, config: &DigestConfig) -> Self {
        Self::with_layout(Quantizer::new(precision), config, COUNTER_WIDTH)
    }
}
