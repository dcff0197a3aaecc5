use crate::{bucket_digest::BucketDigest, percentile_digest::PercentileDigest, store::CounterPage};

/// Approximate value at `percentile` (in `[0, 1]`), `None` for an empty digest.
///
/// Buckets are walked in ascending order until the running count reaches
/// `ceil(percentile * count)`. Observations lost to counter saturation only ever come from full
/// buckets, so they are spread evenly over those. The midpoint of the bucket reaching the rank
/// is returned, clamped to the exact min and max.
pub fn extract(digest: &PercentileDigest, percentile: f64) -> Option<f64> {
    match digest {
        PercentileDigest::Unpacked(inner) => extract_from(inner, percentile),
        PercentileDigest::Packed(inner) => extract_from(inner, percentile),
    }
}

pub fn extract_from<P: CounterPage>(digest: &BucketDigest<P>, percentile: f64) -> Option<f64> {
    let min = digest.min()?;
    let max = digest.max()?;
    if percentile <= 0.0 {
        return Some(min);
    }
    if percentile >= 1.0 {
        return Some(max);
    }
    let count = digest.count();
    let rank = ((percentile * count as f64).ceil() as u64).clamp(1, count);
    let full = digest.max_bucket_count();
    let nb_full = if digest.saturated() > 0 {
        digest.buckets().filter(|(_, n)| *n == full).count() as u64
    } else {
        0
    };
    let (share, remainder) = if nb_full > 0 {
        (digest.saturated() / nb_full, digest.saturated() % nb_full)
    } else {
        (0, 0)
    };
    let mut running = 0u64;
    let mut full_seen = 0u64;
    for (key, mut n) in digest.buckets() {
        if nb_full > 0 && n == full {
            n = n.saturating_add(share + u64::from(full_seen < remainder));
            full_seen += 1;
        }
        running = running.saturating_add(n);
        if running >= rank {
            let estimate = digest.quantizer().representative(key);
            return Some(estimate.clamp(min, max));
        }
    }
    Some(max)
}
