use approx_percentile_digest::config::{AggregationConfig, DEFAULT_MAX_BUCKETS, DigestConfig};
use serial_test::serial;

#[test]
#[serial]
fn test_digest_config_from_env() {
    unsafe { std::env::remove_var("APPROX_PERCENTILE_MAX_BUCKETS") };
    assert_eq!(
        DigestConfig::from_env().expect("default").max_buckets,
        DEFAULT_MAX_BUCKETS
    );

    unsafe { std::env::set_var("APPROX_PERCENTILE_MAX_BUCKETS", "4096") };
    assert_eq!(DigestConfig::from_env().expect("parsed").max_buckets, 4096);

    unsafe { std::env::set_var("APPROX_PERCENTILE_MAX_BUCKETS", "lots") };
    assert!(DigestConfig::from_env().is_err());
    unsafe { std::env::remove_var("APPROX_PERCENTILE_MAX_BUCKETS") };
}

#[test]
#[serial]
fn test_aggregation_config_from_env() {
    unsafe { std::env::set_var("APPROX_PERCENTILE_SHARDS", "6") };
    assert_eq!(
        AggregationConfig::from_env().expect("parsed").nb_shards.get(),
        6
    );

    unsafe { std::env::set_var("APPROX_PERCENTILE_SHARDS", "0") };
    assert!(AggregationConfig::from_env().is_err());

    unsafe { std::env::remove_var("APPROX_PERCENTILE_SHARDS") };
    assert!(AggregationConfig::from_env().expect("default").nb_shards.get() >= 1);
}
