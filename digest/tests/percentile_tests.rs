use approx_percentile_digest::{
    config::DigestConfig,
    finalize::extract,
    percentile_digest::PercentileDigest,
    quantize::mantissa_bits,
};

use test_helpers::*;

const PERCENTILES: [f64; 9] = [0.01, 0.1, 0.25, 0.333, 0.5, 0.75, 0.9, 0.99, 0.999];

#[test]
fn test_empty_digest_has_no_value() {
    for precision in [0, 5] {
        let digest = PercentileDigest::new(precision, &DigestConfig::default());
        assert_eq!(extract(&digest, 0.0), None);
        assert_eq!(extract(&digest, 0.5), None);
        assert_eq!(extract(&digest, 1.0), None);
    }
}

#[test]
fn test_boundaries_return_exact_min_max() {
    let values = random_values(1, 1_000, -250.0, 9_000.0);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for precision in 0..=5 {
        let digest = make_digest(precision, &values);
        assert_eq!(extract(&digest, 0.0), Some(min));
        assert_eq!(extract(&digest, 1.0), Some(max));
    }
}

#[test]
fn test_single_value() {
    let digest = make_digest(3, &[12.5]);
    for p in [0.0, 0.3, 0.5, 1.0] {
        assert_eq!(extract(&digest, p), Some(12.5));
    }
}

#[test]
fn test_error_bound_against_exact_order_statistic() {
    let datasets = [
        random_values(11, 1_000, 0.0, 1_000.0),
        random_values(12, 1_000, -5_000.0, 5_000.0),
        random_values(13, 1_000, 1e-3, 1e6),
    ];
    for values in &datasets {
        for precision in 0..=5 {
            let digest = make_digest(precision, values);
            let bound = digest.quantizer().relative_error();
            for p in PERCENTILES {
                let estimate = extract(&digest, p).expect("non empty digest");
                assert_within_bound(estimate, true_percentile(values, p), bound);
            }
        }
    }
}

#[test]
fn test_error_bound_with_repeated_values() {
    let mut values = Vec::new();
    for (value, repeat) in [(1.0, 500), (10.0, 300), (100.0, 150), (1000.0, 50)] {
        values.extend(std::iter::repeat_n(value, repeat));
    }
    let digest = make_digest(2, &values);
    let bound = digest.quantizer().relative_error();
    for (p, expected) in [(0.5, 1.0), (0.6, 10.0), (0.9, 100.0), (0.99, 1000.0)] {
        assert_within_bound(extract(&digest, p).expect("value"), expected, bound);
    }
}

#[test]
fn test_monotonic_in_percentile() {
    let values = random_values(21, 1_000, -100.0, 100.0);
    for precision in [0, 2, 3, 5] {
        let digest = make_digest(precision, &values);
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=200 {
            let p = step as f64 / 200.0;
            let estimate = extract(&digest, p).expect("non empty digest");
            assert!(estimate >= previous, "p={p} {estimate} < {previous}");
            previous = estimate;
        }
    }
}

#[test]
fn test_unpacked_and_packed_agree() {
    let values = random_values(31, 1_000, 1.0, 10_000.0);
    let unpacked = make_digest(2, &values);
    let packed = make_digest(3, &values);
    let tolerance =
        unpacked.quantizer().relative_error() + packed.quantizer().relative_error();
    for p in PERCENTILES {
        let truth = true_percentile(&values, p);
        let lhs = extract(&unpacked, p).expect("value");
        let rhs = extract(&packed, p).expect("value");
        assert!(
            (lhs - rhs).abs() <= tolerance * truth.abs() + 1e-9,
            "p={p}: {lhs} vs {rhs}"
        );
    }
}

#[test]
fn test_saturated_digest_still_answers() {
    let mut digest = PercentileDigest::new(3, &DigestConfig::default());
    digest.insert_n(5.0, 5_000_000_000);
    digest.insert_n(7.0, 10);
    assert_eq!(digest.count(), 5_000_000_010);
    assert_eq!(digest.bucket_count(5.0), u32::MAX as u64);
    let median = extract(&digest, 0.5).expect("value");
    assert_within_bound(median, 5.0, digest.quantizer().relative_error());
    assert_eq!(extract(&digest, 1.0), Some(7.0));
}

#[test]
fn test_saturated_bucket_does_not_shift_the_tail() {
    let mut digest = PercentileDigest::new(3, &DigestConfig::default());
    digest.insert_n(5.0, 5_000_000_000);
    for i in 0..100_000 {
        digest.insert(10.0 + i as f64);
    }
    assert!(digest.saturated() > 0);
    let count = digest.count() as f64;
    let bound = digest.quantizer().relative_error();
    assert_within_bound(extract(&digest, 0.5).expect("value"), 5.0, bound);

    // rank count - 50_000 is the 50_000th tail value, give or take one rank
    let p = (count - 50_000.0) / count;
    let estimate = extract(&digest, p).expect("value");
    assert_within_bound(estimate, 50_009.0, bound + 1e-4);
}

#[test]
fn test_error_bound_on_wide_range_at_high_precision() {
    for precision in [4, 5] {
        let values = random_values(41 + precision as u64, 200_000, 1.0, 1e6);
        let digest = make_digest(precision, &values);
        let bound = digest.quantizer().relative_error();
        assert!(digest.quantizer().resolution_bits() <= mantissa_bits(precision));
        assert!(bound <= 1e-3, "precision {precision} coarsened to {bound}");
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        for p in PERCENTILES {
            let estimate = extract(&digest, p).expect("non empty digest");
            assert_within_bound(estimate, true_percentile(&sorted, p), bound);
        }
    }
}

#[test]
fn test_tail_percentiles_after_coarsening() {
    let values: Vec<f64> = (1..=20_000).map(|i| i as f64).collect();
    let digest = make_digest_with_config(2, &DigestConfig::new(128), &values);
    assert!(digest.heap_size() <= 128 * size_of::<u64>());
    assert!(digest.quantizer().resolution_bits() < mantissa_bits(2));
    let bound = digest.quantizer().relative_error();
    for p in [0.001, 0.01, 0.5, 0.99, 0.995, 0.999] {
        assert_within_bound(
            extract(&digest, p).expect("value"),
            true_percentile(&values, p),
            bound,
        );
    }
}
