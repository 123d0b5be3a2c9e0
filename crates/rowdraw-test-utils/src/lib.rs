#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::{DataType, Value};
use rowdraw_sampler::query::{
    DescribeQuery, KeyBoundsQuery, LookupQuery, MaterializeQuery, RowCountQuery, RowEstimateQuery,
};
use rowdraw_sampler::{RelationStore, RetryPolicy};
use rowdraw_storage::{Catalog, Field, Record, Schema, Table, TableName};

pub fn table_name(name: &str) -> TableName {
    TableName::parse(name)
}

/// Creates `name (id INT64, label STRING)` with one row per key.
pub fn create_keyed_table(catalog: &Catalog, name: &str, keys: &[i64]) -> Result<()> {
    let name = table_name(name);
    catalog.create_table(
        &name,
        Schema::from_fields(vec![
            Field::required("id", DataType::Int64),
            Field::nullable("label", DataType::String),
        ]),
    )?;
    let rows = keys
        .iter()
        .map(|k| vec![Value::int64(*k), Value::string(format!("row-{}", k))])
        .collect();
    catalog.insert_rows(&name, rows)?;
    Ok(())
}

/// Creates `name (title STRING, body STRING)` with `count` rows and distinct titles.
pub fn create_text_table(catalog: &Catalog, name: &str, count: usize) -> Result<()> {
    let name = table_name(name);
    catalog.create_table(
        &name,
        Schema::from_fields(vec![
            Field::nullable("title", DataType::String),
            Field::nullable("body", DataType::String),
        ]),
    )?;
    let rows = (0..count)
        .map(|i| vec![Value::string(format!("title-{}", i)), Value::string("lorem ipsum")])
        .collect();
    catalog.insert_rows(&name, rows)?;
    Ok(())
}

/// Catalog with `items` keyed by `keys`.
pub fn gapped_catalog(keys: &[i64]) -> Arc<Catalog> {
    let catalog = Catalog::new();
    create_keyed_table(&catalog, "items", keys).expect("fixture table should be created");
    Arc::new(catalog)
}

/// Catalog with `items` keyed `1..=count`.
pub fn dense_catalog(count: i64) -> Arc<Catalog> {
    let keys: Vec<i64> = (1..=count).collect();
    gapped_catalog(&keys)
}

/// Catalog with a keyless `notes` table of `count` rows.
pub fn text_catalog(count: usize) -> Arc<Catalog> {
    let catalog = Catalog::new();
    create_text_table(&catalog, "notes", count).expect("fixture table should be created");
    Arc::new(catalog)
}

pub fn column_i64(table: &Table, column: &str) -> Vec<i64> {
    let index = table
        .schema()
        .field_index(column)
        .unwrap_or_else(|| panic!("no column {}", column));
    table
        .to_records()
        .expect("records")
        .iter()
        .filter_map(|r: &Record| r[index].as_i64())
        .collect()
}

pub fn column_strings(table: &Table, column: &str) -> Vec<String> {
    let index = table
        .schema()
        .field_index(column)
        .unwrap_or_else(|| panic!("no column {}", column));
    table
        .to_records()
        .expect("records")
        .iter()
        .filter_map(|r: &Record| r[index].as_str().map(str::to_string))
        .collect()
}

/// Retry policy that does not sleep between attempts.
pub fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_initial_backoff(std::time::Duration::ZERO)
        .with_max_backoff(std::time::Duration::ZERO)
}

/// Which store calls a [`FlakyStore`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The first `n` calls fail, later ones pass through.
    First(usize),
    /// Every `n`th call fails.
    EveryNth(usize),
    /// Every call fails.
    Always,
}

/// Wraps a store and injects transient `StoreUnavailable` failures.
pub struct FlakyStore<S> {
    inner: S,
    mode: FailureMode,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl<S: RelationStore> FlakyStore<S> {
    pub fn new(inner: S, mode: FailureMode) -> Self {
        Self {
            inner,
            mode,
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn gate(&self, operation: &str) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = match self.mode {
            FailureMode::First(n) => call <= n,
            FailureMode::EveryNth(n) => n > 0 && call % n == 0,
            FailureMode::Always => true,
        };
        if fail {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(Error::store_unavailable(format!(
                "injected failure on {} (call {})",
                operation, call
            )));
        }
        Ok(())
    }
}

impl<S: RelationStore> RelationStore for FlakyStore<S> {
    fn describe(&self, query: &DescribeQuery) -> Result<Schema> {
        self.gate("describe")?;
        self.inner.describe(query)
    }

    fn key_bounds(&self, query: &KeyBoundsQuery) -> Result<Option<(i64, i64)>> {
        self.gate("key_bounds")?;
        self.inner.key_bounds(query)
    }

    fn row_estimate(&self, query: &RowEstimateQuery) -> Result<Option<u64>> {
        self.gate("row_estimate")?;
        self.inner.row_estimate(query)
    }

    fn row_count(&self, query: &RowCountQuery) -> Result<u64> {
        self.gate("row_count")?;
        self.inner.row_count(query)
    }

    fn lookup_keys(&self, query: &LookupQuery) -> Result<Table> {
        self.gate("lookup_keys")?;
        self.inner.lookup_keys(query)
    }

    fn materialize(&self, query: &MaterializeQuery) -> Result<Table> {
        self.gate("materialize")?;
        self.inner.materialize(query)
    }
}

/// Pearson's chi-square statistic of `observed` counts against a uniform expectation.
pub fn chi_square_uniform(observed: &[u64]) -> f64 {
    let total: u64 = observed.iter().sum();
    if observed.is_empty() || total == 0 {
        return 0.0;
    }
    let expected = total as f64 / observed.len() as f64;
    observed
        .iter()
        .map(|&o| {
            let d = o as f64 - expected;
            d * d / expected
        })
        .sum()
}

/// Upper critical value of chi-square with `df` degrees of freedom at p = 0.001
/// (Wilson-Hilferty approximation).
pub fn chi_square_critical_001(df: usize) -> f64 {
    let df = df.max(1) as f64;
    let z = 3.090_232;
    let a = 2.0 / (9.0 * df);
    df * (1.0 - a + z * a.sqrt()).powi(3)
}

pub fn assert_float_eq(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff < epsilon,
        "Float values not equal within epsilon: actual={}, expected={}, diff={}, epsilon={}",
        actual,
        expected,
        diff,
        epsilon
    );
}

pub fn assert_error_contains<T>(result: Result<T>, keywords: &[&str]) {
    match result {
        Ok(_) => panic!("Expected error but got Ok result"),
        Err(e) => {
            let error_msg = e.to_string().to_lowercase();
            let found = keywords
                .iter()
                .any(|keyword| error_msg.contains(&keyword.to_lowercase()));
            assert!(
                found,
                "Error message '{}' does not contain any of the expected keywords: {:?}",
                e, keywords
            );
        }
    }
}
