use std::sync::Arc;
use std::time::Instant;

use debug_print::debug_eprintln;
use rowdraw_common::error::Result;
use rowdraw_storage::{Record, Table};
use tracing::{info, instrument, warn};

use crate::candidates::CandidateGenerator;
use crate::introspect::{ColumnDescriptor, introspect};
use crate::keyed::sample_keyed;
use crate::keyless::sample_keyless;
use crate::metrics::SampleMetrics;
use crate::options::{CancelHandle, CountSource, SampleOptions};
use crate::outcome::SampleOutcome;
use crate::query::{DescribeQuery, KeyBoundsQuery, LookupQuery, MaterializeQuery, RowCountQuery, RowEstimateQuery};
use crate::sql::{Ident, PreparedStatement, RelationName, positional_lookup_statement};
use crate::store::RelationStore;

/// Draws `options.limit` rows uniformly at random from `relation`.
///
/// The result has exactly the relation's declared columns, in order. A short result
/// carries a non-complete status instead of an error.
#[instrument(skip_all, fields(relation = %relation, limit = options.limit, key = ?options.key_column))]
pub fn sample_relation(
    store: &dyn RelationStore,
    relation: &RelationName,
    options: &SampleOptions,
    cancel: &CancelHandle,
) -> Result<SampleOutcome> {
    let started = Instant::now();
    options.validate()?;

    let mut retries = 0;
    let handle = introspect(store, relation, &options.retry, &mut retries)?;
    let mut generator = CandidateGenerator::new(options.seed);

    let mut collected = match &options.key_column {
        Some(key) => {
            let key = Ident::new(key.as_str())?;
            sample_keyed(store, &handle, &key, options, cancel, &mut generator)?
        }
        None => sample_keyless(store, &handle, options, cancel, &mut generator)?,
    };
    collected.stats.retries += retries;
    collected.stats.elapsed = started.elapsed();

    let rows = collected
        .records
        .into_iter()
        .map(Record::into_values)
        .collect();
    let table = Table::from_values(handle.schema().clone(), rows)?;

    if collected.status.is_complete() {
        info!(
            rows = table.row_count(),
            iterations = collected.stats.iterations,
            "sample complete"
        );
    } else {
        warn!(
            rows = table.row_count(),
            requested = options.limit,
            status = %collected.status,
            "sample short of requested size"
        );
    }

    Ok(SampleOutcome {
        table,
        status: collected.status,
        stats: collected.stats,
    })
}

/// Statements a sample of `relation` would issue, in order. The lookup is shown with
/// an empty candidate array.
pub fn explain_relation(
    store: &dyn RelationStore,
    relation: &RelationName,
    options: &SampleOptions,
) -> Result<Vec<PreparedStatement>> {
    let mut retries = 0;
    let handle = introspect(store, relation, &options.retry, &mut retries)?;
    let mut statements = vec![
        DescribeQuery {
            relation: relation.clone(),
        }
        .statement(),
    ];
    match &options.key_column {
        Some(key) => {
            handle.key_column(key)?;
            let key = Ident::new(key.as_str())?;
            statements.push(
                KeyBoundsQuery {
                    relation: relation.clone(),
                    key: key.clone(),
                }
                .statement(),
            );
            if options.count_source == CountSource::Statistics {
                statements.push(
                    RowEstimateQuery {
                        relation: relation.clone(),
                    }
                    .statement(),
                );
            }
            statements.push(
                RowCountQuery {
                    relation: relation.clone(),
                }
                .statement(),
            );
            statements.push(
                LookupQuery {
                    relation: relation.clone(),
                    columns: handle.idents(),
                    key,
                    candidates: Vec::new(),
                }
                .statement(),
            );
        }
        None => {
            statements.push(
                MaterializeQuery {
                    relation: relation.clone(),
                    columns: handle.idents(),
                }
                .statement(),
            );
            statements.push(positional_lookup_statement(&handle.idents(), &[]));
        }
    }
    Ok(statements)
}

/// A store plus shared metrics. Cheap to clone; clones share both.
#[derive(Clone)]
pub struct Sampler {
    store: Arc<dyn RelationStore>,
    metrics: Arc<SampleMetrics>,
}

impl Sampler {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            metrics: Arc::new(SampleMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SampleMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<SampleMetrics> {
        &self.metrics
    }

    pub fn columns(&self, relation: &RelationName) -> Result<Vec<ColumnDescriptor>> {
        crate::introspect::columns(self.store.as_ref(), relation)
    }

    pub fn sample(&self, relation: &RelationName, options: &SampleOptions) -> Result<SampleOutcome> {
        self.sample_with_cancel(relation, options, &CancelHandle::new())
    }

    pub fn sample_with_cancel(
        &self,
        relation: &RelationName,
        options: &SampleOptions,
        cancel: &CancelHandle,
    ) -> Result<SampleOutcome> {
        let start = Instant::now();
        let result = sample_relation(self.store.as_ref(), relation, options, cancel);
        let elapsed = start.elapsed();

        match &result {
            Ok(outcome) => self.metrics.record_sample(outcome.status, &outcome.stats),
            Err(_) => self.metrics.record_error(elapsed),
        }

        if elapsed >= self.metrics.slow_sample_threshold() {
            debug_eprintln!(
                "[sampler::sample] Slow sample detected: {:?} - relation: {} limit: {}",
                elapsed,
                relation,
                options.limit
            );
        }

        result
    }

    pub fn explain(&self, relation: &RelationName, options: &SampleOptions) -> Result<Vec<PreparedStatement>> {
        explain_relation(self.store.as_ref(), relation, options)
    }
}
