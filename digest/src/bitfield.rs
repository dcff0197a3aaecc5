//! Fixed-width unsigned fields packed inside `u64` words.
//!
//! Fields are addressed by their bit `shift` inside the word and their `width` in bits.
//! Callers guarantee `shift + width <= 64`.

/// Mask with the low `width` bits set.
pub fn field_mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Largest value a field of `width` bits can hold.
pub fn field_max(width: u32) -> u64 {
    field_mask(width)
}

pub fn extract_field(word: u64, shift: u32, width: u32) -> u64 {
    (word >> shift) & field_mask(width)
}

/// Returns `word` with the field replaced by the low `width` bits of `value`.
pub fn insert_field(word: u64, shift: u32, width: u32, value: u64) -> u64 {
    let mask = field_mask(width) << shift;
    (word & !mask) | ((value & field_mask(width)) << shift)
}

/// Adds `n` to a field, saturating at [`field_max`] instead of carrying into the
/// neighbouring field. Returns the new word and the amount actually added.
pub fn add_field_saturating(word: u64, shift: u32, width: u32, n: u64) -> (u64, u64) {
    let current = extract_field(word, shift, width);
    let next = current.saturating_add(n).min(field_max(width));
    (insert_field(word, shift, width, next), next - current)
}
