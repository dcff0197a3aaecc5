use anyhow::{Context, Result};
use micromegas_tracing::prelude::*;
use std::{hash::Hash, num::NonZeroUsize};
use tokio::task::JoinSet;

use crate::{
    config::AggregationConfig, factory::ApproxPercentile, group_table::GroupStateTable,
    merge::tree_combine,
};

/// Distributes rows round-robin over `nb_shards` shards.
pub fn split_into_shards<K>(
    rows: impl IntoIterator<Item = (K, f64)>,
    nb_shards: NonZeroUsize,
) -> Vec<Vec<(K, f64)>> {
    let mut shards: Vec<Vec<(K, f64)>> = (0..nb_shards.get()).map(|_| Vec::new()).collect();
    for (index, row) in rows.into_iter().enumerate() {
        shards[index % nb_shards.get()].push(row);
    }
    shards
}

/// Builds the private table of one shard.
pub fn aggregate_shard<K: Hash + Eq>(
    function: ApproxPercentile,
    rows: impl IntoIterator<Item = (K, f64)>,
) -> GroupStateTable<K> {
    let mut table = GroupStateTable::new(function);
    for (key, value) in rows {
        table.route(key, value);
    }
    table
}

/// Aggregates every shard on its own blocking task, then merges the shard tables once all of
/// them are done. Dropping the returned future drops the partial tables.
#[span_fn]
pub async fn aggregate_sharded<K>(
    function: ApproxPercentile,
    shards: Vec<Vec<(K, f64)>>,
) -> Result<GroupStateTable<K>>
where
    K: Hash + Eq + Send + 'static,
{
    let nb_shards = shards.len();
    let mut tasks = JoinSet::new();
    for rows in shards {
        tasks.spawn_blocking(move || aggregate_shard(function, rows));
    }
    let mut tables = Vec::with_capacity(nb_shards);
    while let Some(joined) = tasks.join_next().await {
        tables.push(joined.with_context(|| "joining shard aggregation task")?);
    }
    let rejected_rows: u64 = tables.iter().map(GroupStateTable::rejected_rows).sum();
    if rejected_rows > 0 {
        debug!("skipped {rejected_rows} non-finite values");
    }
    let table = tree_combine(tables)
        .with_context(|| "merging shard tables")?
        .unwrap_or_else(|| GroupStateTable::new(function));
    info!("aggregated {nb_shards} shards into {} groups", table.len());
    imetric!("approx_percentile_groups", "count", table.len() as u64);
    imetric!("approx_percentile_memory", "bytes", table.heap_size() as u64);
    Ok(table)
}

/// Splits `rows` according to `config` and aggregates them in parallel.
pub async fn aggregate_rows<K>(
    function: ApproxPercentile,
    rows: impl IntoIterator<Item = (K, f64)>,
    config: &AggregationConfig,
) -> Result<GroupStateTable<K>>
where
    K: Hash + Eq + Send + 'static,
{
    aggregate_sharded(function, split_into_shards(rows, config.nb_shards)).await
}
