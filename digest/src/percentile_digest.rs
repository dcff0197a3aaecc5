use crate::{
    config::DigestConfig, error::DigestError, packed::PackedDigest, quantize::Quantizer,
    unpacked::UnpackedDigest,
};

/// Highest precision served by [`UnpackedDigest`].
pub const UNPACKED_MAX_PRECISION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestVariant {
    Unpacked,
    Packed,
}

impl DigestVariant {
    pub fn for_precision(precision: u8) -> Self {
        if precision <= UNPACKED_MAX_PRECISION {
            Self::Unpacked
        } else {
            Self::Packed
        }
    }
}

/// A digest of either storage layout. The variant is chosen once, from the precision.
#[derive(Debug, Clone, PartialEq)]
pub enum PercentileDigest {
    Unpacked(UnpackedDigest),
    Packed(PackedDigest),
}

macro_rules! dispatch {
    ($digest:expr, $inner:ident => $body:expr) => {
        match $digest {
            PercentileDigest::Unpacked($inner) => $body,
            PercentileDigest::Packed($inner) => $body,
        }
    };
}

impl PercentileDigest {
    pub fn new(precision: u8, config: &DigestConfig) -> Self {
        match DigestVariant::for_precision(precision) {
            DigestVariant::Unpacked => Self::Unpacked(UnpackedDigest::new(precision, config)),
            DigestVariant::Packed => Self::Packed(PackedDigest::new(precision, config)),
        }
    }

    pub fn variant(&self) -> DigestVariant {
        match self {
            Self::Unpacked(_) => DigestVariant::Unpacked,
            Self::Packed(_) => DigestVariant::Packed,
        }
    }

    pub fn quantizer(&self) -> &Quantizer {
        dispatch!(self, digest => digest.quantizer())
    }

    pub fn precision(&self) -> u8 {
        dispatch!(self, digest => digest.precision())
    }

    pub fn max_buckets(&self) -> usize {
        dispatch!(self, digest => digest.max_buckets())
    }

    pub fn count(&self) -> u64 {
        dispatch!(self, digest => digest.count())
    }

    pub fn stored_count(&self) -> u64 {
        dispatch!(self, digest => digest.stored_count())
    }

    pub fn saturated(&self) -> u64 {
        dispatch!(self, digest => digest.saturated())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, digest => digest.is_empty())
    }

    pub fn min(&self) -> Option<f64> {
        dispatch!(self, digest => digest.min())
    }

    pub fn max(&self) -> Option<f64> {
        dispatch!(self, digest => digest.max())
    }

    pub fn heap_size(&self) -> usize {
        dispatch!(self, digest => digest.heap_size())
    }

    pub fn bucket_count(&self, value: f64) -> u64 {
        dispatch!(self, digest => digest.bucket_count(value))
    }

    pub fn max_bucket_count(&self) -> u64 {
        dispatch!(self, digest => digest.max_bucket_count())
    }

    /// Non-empty buckets as `(key, count)` in ascending key order.
    pub fn buckets(&self) -> Box<dyn Iterator<Item = (i64, u64)> + '_> {
        dispatch!(self, digest => Box::new(digest.buckets()))
    }

    /// Records one value, returns `false` when the value is not finite and was skipped.
    pub fn insert(&mut self, value: f64) -> bool {
        dispatch!(self, digest => digest.insert(value))
    }

    pub fn insert_n(&mut self, value: f64, n: u64) -> bool {
        dispatch!(self, digest => digest.insert_n(value, n))
    }

    pub fn merge(&mut self, other: &Self) -> Result<(), DigestError> {
        match (self, other) {
            (Self::Unpacked(lhs), Self::Unpacked(rhs)) => lhs.merge(rhs),
            (Self::Packed(lhs), Self::Packed(rhs)) => lhs.merge(rhs),
            (lhs, rhs) => Err(DigestError::IncompatibleMerge(format!(
                "{:?} digest with {:?} digest",
                lhs.variant(),
                rhs.variant()
            ))),
        }
    }
}
