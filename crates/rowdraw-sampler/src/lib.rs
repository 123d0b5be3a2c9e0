//! Uniform random row sampling over relations addressed by an integer key or by
//! position.
//!
//! A sample introspects the relation, estimates the key domain, then repeatedly
//! draws batches of random candidates, resolves them to rows, and deduplicates until
//! the requested count is reached or the relation provably has no more rows.

mod accumulator;
pub mod candidates;
pub mod config;
pub mod estimate;
pub mod introspect;
mod keyed;
mod keyless;
pub mod metrics;
pub mod options;
pub mod outcome;
pub mod query;
pub mod resolve;
pub mod retry;
mod sampler;
pub mod sql;
pub mod store;

pub use config::SamplerConfig;
pub use estimate::KeyDomain;
pub use introspect::{ColumnDescriptor, RelationHandle, columns, introspect};
pub use metrics::SampleMetrics;
pub use options::{CancelHandle, CountSource, SampleOptions};
pub use outcome::{SampleOutcome, SampleStats, SampleStatus};
pub use retry::RetryPolicy;
pub use sampler::{Sampler, explain_relation, sample_relation};
pub use sql::{Ident, Param, PreparedStatement, RelationName};
pub use store::RelationStore;
