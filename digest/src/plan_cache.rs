//! Reuse of compiled query plans across executions.
//!
//! A compiled plan remembers the identity and metadata version of every table it references.
//! Before a cached plan is executed again each reference is checked against the catalog; a
//! mismatch yields [`TableReferenceOutOfDate`] and the plan must be compiled again. Digests are
//! never cached, only plans and the function instances they embed.

use micromegas_tracing::prelude::*;
use moka::future::Cache;
use std::sync::Arc;
use thiserror::Error;

use crate::{error::Error, factory::ApproxPercentile};

/// Identity of a table as seen when a plan was compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableToken {
    pub name: String,
    pub table_id: u32,
    pub metadata_version: u64,
}

impl TableToken {
    pub fn new(name: impl Into<String>, table_id: u32, metadata_version: u64) -> Self {
        Self {
            name: name.into(),
            table_id,
            metadata_version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMismatch {
    pub expected_table_id: u32,
    pub actual_table_id: u32,
    pub expected_metadata_version: u64,
    pub actual_metadata_version: u64,
}

/// A cached plan references a table that was dropped, recreated or altered since compilation.
/// `mismatch` is `None` when the table no longer exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "cached query plan cannot be used because table schema has changed [table='{table_name}'{}]",
    describe_mismatch(.mismatch)
)]
pub struct TableReferenceOutOfDate {
    pub table_name: String,
    pub mismatch: Option<TokenMismatch>,
}

fn describe_mismatch(mismatch: &Option<TokenMismatch>) -> String {
    match mismatch {
        Some(m) => format!(
            ", expectedTableId={}, actualTableId={}, expectedMetadataVersion={}, actualMetadataVersion={}",
            m.expected_table_id,
            m.actual_table_id,
            m.expected_metadata_version,
            m.actual_metadata_version
        ),
        None => String::new(),
    }
}

/// Current state of the tables known to the host.
pub trait TableCatalog: Send + Sync {
    fn current(&self, table_name: &str) -> Option<TableToken>;
}

pub fn check_reference(
    expected: &TableToken,
    catalog: &(impl TableCatalog + ?Sized),
) -> Result<(), TableReferenceOutOfDate> {
    let Some(actual) = catalog.current(&expected.name) else {
        return Err(TableReferenceOutOfDate {
            table_name: expected.name.clone(),
            mismatch: None,
        });
    };
    if actual.table_id != expected.table_id
        || actual.metadata_version != expected.metadata_version
    {
        return Err(TableReferenceOutOfDate {
            table_name: expected.name.clone(),
            mismatch: Some(TokenMismatch {
                expected_table_id: expected.table_id,
                actual_table_id: actual.table_id,
                expected_metadata_version: expected.metadata_version,
                actual_metadata_version: actual.metadata_version,
            }),
        });
    }
    Ok(())
}

/// Output of query compilation: table references and the aggregate functions built for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPlan {
    pub sql: String,
    pub references: Vec<TableToken>,
    pub functions: Vec<ApproxPercentile>,
}

impl CompiledPlan {
    pub fn validate(
        &self,
        catalog: &(impl TableCatalog + ?Sized),
    ) -> Result<(), TableReferenceOutOfDate> {
        self.references
            .iter()
            .try_for_each(|reference| check_reference(reference, catalog))
    }
}

/// Compiled plans keyed by query text.
pub struct PlanCache {
    cache: Cache<String, Arc<CompiledPlan>>,
}

impl PlanCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::new(max_capacity),
        }
    }

    /// Returns the cached plan for `sql` if its table references are still current, otherwise
    /// evicts it and compiles the query again.
    pub async fn get_or_compile<F>(
        &self,
        sql: &str,
        catalog: &(impl TableCatalog + ?Sized),
        compile: F,
    ) -> Result<Arc<CompiledPlan>, Error>
    where
        F: FnOnce() -> Result<CompiledPlan, Error>,
    {
        if let Some(plan) = self.cache.get(sql).await {
            match plan.validate(catalog) {
                Ok(()) => return Ok(plan),
                Err(e) => {
                    warn!("{e}, recompiling");
                    self.cache.invalidate(sql).await;
                }
            }
        }
        let plan = Arc::new(compile()?);
        plan.validate(catalog)?;
        self.cache.insert(sql.to_owned(), plan.clone()).await;
        Ok(plan)
    }

    pub async fn invalidate(&self, sql: &str) {
        self.cache.invalidate(sql).await;
    }

    pub async fn contains(&self, sql: &str) -> bool {
        self.cache.get(sql).await.is_some()
    }
}
