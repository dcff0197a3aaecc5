use approx_percentile_digest::{
    Error,
    plan_cache::{
        CompiledPlan, PlanCache, TableCatalog, TableReferenceOutOfDate, TableToken,
        TokenMismatch, check_reference,
    },
};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use test_helpers::*;

#[derive(Default)]
struct InMemoryCatalog {
    tables: Mutex<HashMap<String, TableToken>>,
}

impl InMemoryCatalog {
    fn set(&self, token: TableToken) {
        self.tables
            .lock()
            .expect("lock")
            .insert(token.name.clone(), token);
    }

    fn drop_table(&self, name: &str) {
        self.tables.lock().expect("lock").remove(name);
    }
}

impl TableCatalog for InMemoryCatalog {
    fn current(&self, table_name: &str) -> Option<TableToken> {
        self.tables.lock().expect("lock").get(table_name).cloned()
    }
}

#[test]
fn test_stale_reference_error_message() {
    let catalog = InMemoryCatalog::default();
    catalog.set(TableToken::new("trades", 2, 8));
    let err = check_reference(&TableToken::new("trades", 1, 7), &catalog).expect_err("stale");
    assert_eq!(
        err,
        TableReferenceOutOfDate {
            table_name: "trades".into(),
            mismatch: Some(TokenMismatch {
                expected_table_id: 1,
                actual_table_id: 2,
                expected_metadata_version: 7,
                actual_metadata_version: 8,
            }),
        }
    );
    assert_eq!(
        err.to_string(),
        "cached query plan cannot be used because table schema has changed [table='trades', \
         expectedTableId=1, actualTableId=2, expectedMetadataVersion=7, actualMetadataVersion=8]"
    );

    catalog.drop_table("trades");
    let err = check_reference(&TableToken::new("trades", 1, 7), &catalog).expect_err("dropped");
    assert_eq!(err.mismatch, None);
    assert_eq!(
        err.to_string(),
        "cached query plan cannot be used because table schema has changed [table='trades']"
    );
}

#[test]
fn test_current_reference_is_valid() {
    let catalog = InMemoryCatalog::default();
    catalog.set(TableToken::new("trades", 1, 7));
    catalog.set(TableToken::new("quotes", 3, 1));
    let plan = CompiledPlan {
        sql: "select".into(),
        references: vec![TableToken::new("trades", 1, 7), TableToken::new("quotes", 3, 1)],
        functions: vec![make_function(0.5, 2)],
    };
    assert!(plan.validate(&catalog).is_ok());
    catalog.set(TableToken::new("quotes", 3, 2));
    assert_eq!(
        plan.validate(&catalog).map_err(|e| e.table_name),
        Err("quotes".to_string())
    );
}

#[tokio::test]
async fn test_plan_cache_recompiles_stale_plans() {
    const SQL: &str = "select sym, approx_percentile(price, 0.99, 3) from trades group by sym";
    let catalog = InMemoryCatalog::default();
    catalog.set(TableToken::new("trades", 1, 1));
    let cache = PlanCache::new(16);
    let nb_compilations = AtomicUsize::new(0);
    let compile = || -> Result<CompiledPlan, Error> {
        nb_compilations.fetch_add(1, Ordering::SeqCst);
        Ok(CompiledPlan {
            sql: SQL.into(),
            references: vec![catalog.current("trades").expect("table exists")],
            functions: vec![make_function(0.99, 3)],
        })
    };

    let first = cache.get_or_compile(SQL, &catalog, compile).await.expect("plan");
    let second = cache.get_or_compile(SQL, &catalog, compile).await.expect("plan");
    assert_eq!(nb_compilations.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert!(cache.contains(SQL).await);

    catalog.set(TableToken::new("trades", 1, 2));
    let third = cache.get_or_compile(SQL, &catalog, compile).await.expect("plan");
    assert_eq!(nb_compilations.load(Ordering::SeqCst), 2);
    assert_eq!(third.references[0].metadata_version, 2);

    cache.invalidate(SQL).await;
    assert!(!cache.contains(SQL).await);
}

#[tokio::test]
async fn test_plan_cache_surfaces_compile_errors() {
    let catalog = InMemoryCatalog::default();
    let cache = PlanCache::new(16);
    let result = cache
        .get_or_compile("select", &catalog, || {
            Err(approx_percentile_digest::error::ArgumentError::new(3, "invalid percentile").into())
        })
        .await;
    assert!(matches!(result, Err(Error::Argument(err)) if err.position == 3));
    assert!(!cache.contains("select").await);
}
