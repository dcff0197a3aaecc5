use micromegas_tracing::prelude::*;
use std::{collections::hash_map::Entry, hash::Hash};

use crate::{error::DigestError, group_table::GroupStateTable};

/// Merges two shard tables. Groups present on one side only are moved as they are.
pub fn combine<K: Hash + Eq>(
    lhs: GroupStateTable<K>,
    rhs: GroupStateTable<K>,
) -> Result<GroupStateTable<K>, DigestError> {
    if lhs.function() != rhs.function() {
        return Err(DigestError::IncompatibleTables(format!(
            "{:?} vs {:?}",
            lhs.function().request(),
            rhs.function().request()
        )));
    }
    // fold the smaller table into the larger one
    let (big, small) = if lhs.len() >= rhs.len() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    };
    let (function, mut entries, big_rejected) = big.into_parts();
    let (_, small_entries, small_rejected) = small.into_parts();
    for (key, digest) in small_entries {
        match entries.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(&digest)?,
            Entry::Vacant(vacant) => {
                vacant.insert(digest);
            }
        }
    }
    Ok(GroupStateTable::from_parts(
        function,
        entries,
        big_rejected + small_rejected,
    ))
}

/// Sequential fold over any number of tables. `Ok(None)` when there is no table at all.
pub fn combine_all<K: Hash + Eq>(
    tables: impl IntoIterator<Item = GroupStateTable<K>>,
) -> Result<Option<GroupStateTable<K>>, DigestError> {
    let mut result: Option<GroupStateTable<K>> = None;
    for table in tables {
        result = Some(match result {
            Some(acc) => combine(acc, table)?,
            None => table,
        });
    }
    Ok(result)
}

/// Pairwise reduction: each round halves the number of tables.
#[span_fn]
pub fn tree_combine<K: Hash + Eq>(
    tables: Vec<GroupStateTable<K>>,
) -> Result<Option<GroupStateTable<K>>, DigestError> {
    let nb_tables = tables.len();
    let mut round = tables;
    while round.len() > 1 {
        let mut next = Vec::with_capacity(round.len().div_ceil(2));
        let mut tables = round.into_iter();
        while let Some(lhs) = tables.next() {
            match tables.next() {
                Some(rhs) => next.push(combine(lhs, rhs)?),
                None => next.push(lhs),
            }
        }
        round = next;
    }
    let result = round.pop();
    if let Some(table) = &result {
        debug!("combined {nb_tables} tables into {} groups", table.len());
    }
    Ok(result)
}
