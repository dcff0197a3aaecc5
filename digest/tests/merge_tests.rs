use approx_percentile_digest::{
    error::DigestError,
    finalize::extract,
    group_table::GroupStateTable,
    merge::{combine, combine_all, tree_combine},
    percentile_digest::PercentileDigest,
};

use test_helpers::*;

fn merged(lhs: &PercentileDigest, rhs: &PercentileDigest) -> PercentileDigest {
    let mut result = lhs.clone();
    result.merge(rhs).expect("merge");
    result
}

#[test]
fn test_merge_of_partitions_equals_whole() {
    let values = random_values(41, 1_000, -300.0, 3_000.0);
    for precision in [1, 2, 3, 5] {
        let whole = make_digest(precision, &values);
        for nb_chunks in [2, 3, 7] {
            let chunk_size = values.len().div_ceil(nb_chunks);
            let mut result = make_digest(precision, &[]);
            for chunk in values.chunks(chunk_size) {
                result.merge(&make_digest(precision, chunk)).expect("merge");
            }
            assert_eq!(result, whole);
            for p in [0.0, 0.1, 0.5, 0.9, 1.0] {
                assert_eq!(extract(&result, p), extract(&whole, p));
            }
        }
    }
}

#[test]
fn test_merge_is_commutative_and_associative() {
    for precision in [2, 4] {
        let a = make_digest(precision, &random_values(51, 300, 0.0, 50.0));
        let b = make_digest(precision, &random_values(52, 300, 25.0, 900.0));
        let c = make_digest(precision, &random_values(53, 300, -10.0, 10.0));
        assert_eq!(merged(&a, &b), merged(&b, &a));
        assert_eq!(
            merged(&merged(&a, &b), &c),
            merged(&a, &merged(&b, &c))
        );
    }
}

#[test]
fn test_merge_with_empty_digest() {
    let digest = make_digest(3, &[1.0, 2.0, 3.0]);
    let empty = make_digest(3, &[]);
    assert_eq!(merged(&digest, &empty), digest);
    assert_eq!(merged(&empty, &digest), digest);
}

fn make_table(
    function: approx_percentile_digest::factory::ApproxPercentile,
    rows: &[(&'static str, f64)],
) -> GroupStateTable<&'static str> {
    let mut table = GroupStateTable::new(function);
    for (key, value) in rows {
        table.route(*key, *value);
    }
    table
}

#[test]
fn test_combine_merges_shared_keys_and_passes_others() {
    let function = make_function(0.5, 2);
    let lhs = make_table(function, &[("a", 1.0), ("a", 2.0), ("b", 10.0)]);
    let rhs = make_table(function, &[("a", 3.0), ("c", 100.0), ("c", f64::NAN)]);
    let expected_b = lhs.get(&"b").cloned();
    let expected_c = rhs.get(&"c").cloned();

    let table = combine(lhs, rhs).expect("combine");
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(&"a").map(PercentileDigest::count), Some(3));
    assert_eq!(table.get(&"b").cloned(), expected_b);
    assert_eq!(table.get(&"c").cloned(), expected_c);
    assert_eq!(table.get(&"d"), None);
    assert_eq!(table.rejected_rows(), 1);
}

#[test]
fn test_combine_order_does_not_matter() {
    let function = make_function(0.9, 3);
    let values = random_values(61, 900, 0.0, 100.0);
    let keys = ["x", "y", "z"];
    let tables: Vec<GroupStateTable<&'static str>> = values
        .chunks(100)
        .map(|chunk| {
            let mut table = GroupStateTable::new(function);
            for (i, v) in chunk.iter().enumerate() {
                table.route(keys[i % keys.len()], *v);
            }
            table
        })
        .collect();

    let sequential = combine_all(tables.clone()).expect("combine").expect("table");
    let reversed = combine_all(tables.iter().rev().cloned())
        .expect("combine")
        .expect("table");
    let tree = tree_combine(tables).expect("combine").expect("table");

    for key in keys {
        assert_eq!(sequential.get(&key), reversed.get(&key));
        assert_eq!(sequential.get(&key), tree.get(&key));
    }
    let total: u64 = sequential.iter().map(|(_, digest)| digest.count()).sum();
    assert_eq!(total, 900);
}

#[test]
fn test_combine_empty_input() {
    let tables: Vec<GroupStateTable<u32>> = Vec::new();
    assert!(combine_all(tables.clone()).expect("combine").is_none());
    assert!(tree_combine(tables).expect("combine").is_none());
}

#[test]
fn test_combine_rejects_different_functions() {
    let lhs = make_table(make_function(0.5, 2), &[("a", 1.0)]);
    let rhs = make_table(make_function(0.5, 3), &[("a", 1.0)]);
    assert!(matches!(
        combine(lhs, rhs),
        Err(DigestError::IncompatibleTables(_))
    ));
}
