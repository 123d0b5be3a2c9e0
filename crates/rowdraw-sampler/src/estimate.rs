use rowdraw_common::error::{Error, Result};
use tracing::{debug, instrument};

use crate::introspect::RelationHandle;
use crate::options::CountSource;
use crate::query::{KeyBoundsQuery, RowCountQuery, RowEstimateQuery};
use crate::retry::RetryPolicy;
use crate::sql::Ident;
use crate::store::RelationStore;

/// Integer interval candidates are drawn from, with an advisory row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDomain {
    pub min: i64,
    pub max: i64,
    pub estimated_count: u64,
}

impl KeyDomain {
    pub fn new(min: i64, max: i64, estimated_count: u64) -> Result<Self> {
        if min > max {
            return Err(Error::internal(format!(
                "key domain min {} exceeds max {}",
                min, max
            )));
        }
        Ok(Self {
            min,
            max,
            estimated_count,
        })
    }

    /// Dense positions `1..=count`, as used when there is no key column.
    pub fn positional(count: u64) -> Option<Self> {
        let max = i64::try_from(count).ok()?;
        (count > 0).then_some(Self {
            min: 1,
            max,
            estimated_count: count,
        })
    }

    /// Number of integers in `[min, max]`, saturating at `u64::MAX`.
    pub fn span(&self) -> u64 {
        let span = self.max as i128 - self.min as i128 + 1;
        u64::try_from(span).unwrap_or(u64::MAX)
    }

    /// Expected fraction of candidates that hit a row, in `(0, 1]`.
    pub fn density(&self) -> f64 {
        let estimated = self.estimated_count.max(1) as f64;
        (estimated / self.span() as f64).min(1.0)
    }

    pub fn batch_size(&self, deficit: usize, gaps: f64, max_batch_size: usize) -> usize {
        batch_size(deficit, gaps, self.density(), max_batch_size)
    }
}

/// `ceil(deficit * gaps / density)`, at least `deficit` and at most `max_batch_size`.
pub fn batch_size(deficit: usize, gaps: f64, density: f64, max_batch_size: usize) -> usize {
    let wanted = (deficit as f64 * gaps / density).ceil();
    let wanted = if wanted.is_finite() && wanted < usize::MAX as f64 {
        wanted as usize
    } else {
        usize::MAX
    };
    wanted.max(deficit).min(max_batch_size)
}

/// Domain of `key` in the relation, or `None` when the key has no non-null values.
#[instrument(skip_all, fields(relation = %handle.relation(), key = %key))]
pub fn estimate(
    store: &dyn RelationStore,
    handle: &RelationHandle,
    key: &Ident,
    count_source: CountSource,
    retry: &RetryPolicy,
    retries: &mut u64,
) -> Result<Option<KeyDomain>> {
    handle.key_column(key.as_str())?;
    let relation = handle.relation().clone();

    let bounds_query = KeyBoundsQuery {
        relation: relation.clone(),
        key: key.clone(),
    };
    debug!(sql = bounds_query.statement().sql(), "key bounds");
    let Some((min, max)) = retry.run("key_bounds", retries, || store.key_bounds(&bounds_query))?
    else {
        return Ok(None);
    };

    let estimated_count = match count_source {
        CountSource::Statistics => {
            let stats_query = RowEstimateQuery {
                relation: relation.clone(),
            };
            match retry.run("row_estimate", retries, || store.row_estimate(&stats_query))? {
                Some(count) => count,
                None => exact_count(store, &RowCountQuery { relation }, retry, retries)?,
            }
        }
        CountSource::Exact => exact_count(store, &RowCountQuery { relation }, retry, retries)?,
    };

    let domain = KeyDomain::new(min, max, estimated_count)?;
    debug!(
        min,
        max,
        estimated_count,
        density = domain.density(),
        "estimated key domain"
    );
    Ok(Some(domain))
}

pub(crate) fn exact_count(
    store: &dyn RelationStore,
    query: &RowCountQuery,
    retry: &RetryPolicy,
    retries: &mut u64,
) -> Result<u64> {
    debug!(sql = query.statement().sql(), "exact row count");
    retry.run("row_count", retries, || store.row_count(query))
}
