//! Log-linear bucketing of `f64` values.
//!
//! A bucket keeps the sign, the exponent and the top `m` mantissa bits of a value, where `m`
//! depends on the precision. Within a binade `[2^e, 2^(e+1))` there are `2^m` buckets of equal
//! width, so a bucket spans at most a factor `1 + 2^-m` and its midpoint is within a relative
//! error of `2^-(m+1)` of any value it contains. With `m = ceil(precision * log2(10)) + 1` this
//! bound is at most `10^-precision / 4`.
//!
//! Keys are `i64` and sort in the same order as the values they represent, so digests can walk
//! their buckets in key order to find a percentile.
//!
//! A digest that runs out of pages coarsens its quantizer one mantissa bit at a time. The key of
//! a value in the coarser quantizer is the old key shifted right, so buckets can be re-keyed
//! without the original values. The error bound follows the bits actually kept, see
//! [`Quantizer::relative_error`].

/// Lowest supported precision (number of significant decimal digits).
pub const MIN_PRECISION: u8 = 0;
/// Highest supported precision.
pub const MAX_PRECISION: u8 = 5;

const F64_MANTISSA_BITS: u32 = 52;
const F64_INFINITY_BITS: u64 = 0x7FF0_0000_0000_0000;

const MANTISSA_BITS_BY_PRECISION: [u32; (MAX_PRECISION + 1) as usize] = [1, 5, 8, 11, 15, 18];

/// Number of mantissa bits kept in a bucket key for the given precision.
pub fn mantissa_bits(precision: u8) -> u32 {
    MANTISSA_BITS_BY_PRECISION[precision.min(MAX_PRECISION) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantizer {
    precision: u8,
    shift: u32,
}

impl Quantizer {
    pub fn new(precision: u8) -> Self {
        let precision = precision.min(MAX_PRECISION);
        Self {
            precision,
            shift: F64_MANTISSA_BITS - mantissa_bits(precision),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Mantissa bits currently kept in a key. Equal to [`mantissa_bits`] of the precision until
    /// the quantizer is coarsened.
    pub fn resolution_bits(&self) -> u32 {
        F64_MANTISSA_BITS - self.shift
    }

    /// Same precision with only `bits` mantissa bits, `None` when `bits` is finer than the
    /// precision allows.
    pub fn with_resolution_bits(&self, bits: u32) -> Option<Self> {
        (bits <= mantissa_bits(self.precision)).then_some(Self {
            precision: self.precision,
            shift: F64_MANTISSA_BITS - bits,
        })
    }

    /// One mantissa bit less, `None` once a bucket already spans a whole binade.
    pub fn coarsen(&self) -> Option<Self> {
        (self.shift < F64_MANTISSA_BITS).then_some(Self {
            precision: self.precision,
            shift: self.shift + 1,
        })
    }

    /// Key in `coarser` of a bucket of `self`. `coarser` keeps at most as many bits as `self`.
    pub fn rekey(&self, key: i64, coarser: &Quantizer) -> i64 {
        debug_assert!(coarser.shift >= self.shift);
        // arithmetic shift keeps `-(k >> s) - 1` for negative keys
        key >> (coarser.shift - self.shift)
    }

    /// Whether `key` is the key of some finite value.
    pub fn is_valid_key(&self, key: i64) -> bool {
        magnitude_index(key) < (F64_INFINITY_BITS >> self.shift)
    }

    /// Upper bound of the relative error between a bucket representative and any value of
    /// that bucket.
    pub fn relative_error(&self) -> f64 {
        0.5_f64.powi(self.resolution_bits() as i32 + 1)
    }

    /// Bucket key of a finite value. `-0.0` and `0.0` share a key.
    pub fn key(&self, value: f64) -> i64 {
        debug_assert!(value.is_finite());
        if value == 0.0 {
            return 0;
        }
        if value.is_sign_negative() {
            -(((-value).to_bits() >> self.shift) as i64) - 1
        } else {
            (value.to_bits() >> self.shift) as i64
        }
    }

    /// Value range `[low, high)` covered by a key (`(low, high]` for negative keys).
    pub fn bounds(&self, key: i64) -> (f64, f64) {
        let magnitude_index = magnitude_index(key);
        let low = f64::from_bits(magnitude_index << self.shift);
        let high = f64::from_bits((magnitude_index + 1) << self.shift);
        if key >= 0 { (low, high) } else { (-high, -low) }
    }

    /// Value reported for a bucket: the midpoint of its range.
    pub fn representative(&self, key: i64) -> f64 {
        let (low, high) = self.bounds(key);
        match (low.is_finite(), high.is_finite()) {
            (true, true) => low + (high - low) / 2.0,
            (true, false) => low,
            (false, _) => high,
        }
    }
}

fn magnitude_index(key: i64) -> u64 {
    if key >= 0 {
        key as u64
    } else {
        (-(key + 1)) as u64
    }
}
