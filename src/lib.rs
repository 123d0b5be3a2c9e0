//! rowdraw - uniform random row sampling.
//!
//! rowdraw draws a uniformly distributed random subset of rows from a relation
//! without knowing its schema up front and without sorting the whole relation.
//!
//! # Architecture
//!
//! A sample runs through:
//! ```text
//! Relation → Introspect → Estimate key domain → (Draw batch → Resolve → Deduplicate)* → Result
//! ```
//!
//! Relations with an integer key are sampled by drawing key values. Relations
//! without one are numbered once into a working view and sampled by position.
//!
//! # Example
//!
//! ```rust,ignore
//! use rowdraw::{RowDrawEngine, SampleOptions, Schema, Field, DataType, TableName, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = RowDrawEngine::new();
//!     let session = engine.create_session();
//!
//!     let users = TableName::new(None, "users");
//!     session
//!         .catalog()
//!         .create_table(&users, Schema::from_fields(vec![
//!             Field::required("id", DataType::Int64),
//!             Field::nullable("name", DataType::String),
//!         ]))
//!         .unwrap();
//!     session
//!         .catalog()
//!         .insert_rows(&users, vec![vec![Value::int64(1), Value::string("Alice")]])
//!         .unwrap();
//!
//!     let outcome = session
//!         .sample("users", SampleOptions::new(1).with_key_column("id"))
//!         .await
//!         .unwrap();
//!     assert_eq!(outcome.row_count(), 1);
//! }
//! ```

use std::sync::Arc;

pub use rowdraw_common::error::{Error, Result};
pub use rowdraw_common::result::{ColumnInfo, QueryResult, Row};
pub use rowdraw_common::types::{DataType, Value};
pub use rowdraw_sampler::{
    CancelHandle, ColumnDescriptor, CountSource, PreparedStatement, RelationName,
    RelationStore, RetryPolicy, SampleMetrics, SampleOptions, SampleOutcome, SampleStats,
    SampleStatus, Sampler, SamplerConfig,
};
pub use rowdraw_storage::{Catalog, Field, FieldMode, Record, Schema, Table, TableName};
use tracing::{debug, instrument};

/// Factory for sessions.
///
/// `RowDrawEngine` is lightweight and can be shared across threads. Each session it
/// creates has its own isolated catalog and metrics.
pub struct RowDrawEngine {
    config: SamplerConfig,
}

impl RowDrawEngine {
    /// Creates an engine with default sampler settings.
    pub fn new() -> Self {
        Self {
            config: SamplerConfig::default(),
        }
    }

    /// Creates an engine whose sessions build options from `config`.
    pub fn with_config(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Creates a new session over an empty catalog.
    pub fn create_session(&self) -> RowDrawSession {
        RowDrawSession::with_catalog(Arc::new(Catalog::new())).with_config(self.config.clone())
    }
}

impl Default for RowDrawEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A catalog plus a sampler over it.
///
/// | Method | Returns | Use Case |
/// |--------|---------|----------|
/// | [`sample`](Self::sample) | `SampleOutcome` | Async callers; runs on the blocking pool |
/// | [`sample_blocking`](Self::sample_blocking) | `SampleOutcome` | Synchronous callers |
/// | [`query`](Self::query) | `QueryResult` | Row-based results, easy to serialize |
/// | [`columns`](Self::columns) | `Vec<ColumnDescriptor>` | Schema introspection |
/// | [`explain`](Self::explain) | `Vec<PreparedStatement>` | Statements a sample would issue |
///
/// Relation names are parsed with [`RelationName::parse`], so `"schema.table"` and
/// quoted parts are accepted.
pub struct RowDrawSession {
    catalog: Arc<Catalog>,
    sampler: Sampler,
    config: SamplerConfig,
}

impl RowDrawSession {
    /// Creates a session with an empty catalog.
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(Catalog::new()))
    }

    /// Creates a session sampling from an existing catalog.
    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        let store: Arc<dyn RelationStore> = catalog.clone();
        Self {
            catalog,
            sampler: Sampler::new(store),
            config: SamplerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// Options for `limit` rows seeded with this session's configured defaults.
    pub fn options(&self, limit: usize) -> SampleOptions {
        self.config.options(limit)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<SampleMetrics> {
        self.sampler.metrics()
    }

    /// Declared columns of `relation`, in order, with quoted names.
    pub fn columns(&self, relation: &str) -> Result<Vec<ColumnDescriptor>> {
        self.sampler.columns(&RelationName::parse(relation)?)
    }

    /// Samples on the calling thread.
    pub fn sample_blocking(&self, relation: &str, options: &SampleOptions) -> Result<SampleOutcome> {
        self.sampler.sample(&RelationName::parse(relation)?, options)
    }

    /// Samples on tokio's blocking pool.
    #[instrument(skip(self, options), fields(limit = options.limit))]
    pub async fn sample(&self, relation: &str, options: SampleOptions) -> Result<SampleOutcome> {
        self.sample_with_cancel(relation, options, CancelHandle::new())
            .await
    }

    /// Like [`sample`](Self::sample); setting `cancel` stops the sample at the next
    /// batch boundary with [`Error::Cancelled`].
    pub async fn sample_with_cancel(
        &self,
        relation: &str,
        options: SampleOptions,
        cancel: CancelHandle,
    ) -> Result<SampleOutcome> {
        let relation = RelationName::parse(relation)?;
        let sampler = self.sampler.clone();
        debug!(relation = %relation, "dispatching sample to blocking pool");
        tokio::task::spawn_blocking(move || sampler.sample_with_cancel(&relation, &options, &cancel))
            .await
            .map_err(|e| Error::internal(e.to_string()))?
    }

    /// Samples and returns row-based results.
    pub async fn query(&self, relation: &str, options: SampleOptions) -> Result<QueryResult> {
        self.sample(relation, options).await?.to_query_result()
    }

    pub fn explain(&self, relation: &str, options: &SampleOptions) -> Result<Vec<PreparedStatement>> {
        self.sampler.explain(&RelationName::parse(relation)?, options)
    }
}

impl Default for RowDrawSession {
    fn default() -> Self {
        Self::new()
    }
}
