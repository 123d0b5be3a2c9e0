use rowdraw_common::error::{Error, Result};
use rowdraw_storage::{Record, Table};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::query::LookupQuery;
use crate::retry::RetryPolicy;
use crate::sql::{Ident, RelationName, positional_lookup_statement};
use crate::store::RelationStore;

/// A row found for a candidate, with the integer it is deduplicated by.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub identity: i64,
    pub record: Record,
}

/// Maps candidates to rows. Candidates without a row are dropped; each row found
/// comes back once however often its candidate was drawn.
pub trait RowResolver {
    fn resolve(&self, candidates: &[i64], retries: &mut u64) -> Result<Vec<Resolved>>;
}

fn distinct(candidates: &[i64]) -> Vec<i64> {
    let mut keys = candidates.to_vec();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Equality lookup on an integer key column of the relation.
pub struct KeyedResolver<'a> {
    store: &'a dyn RelationStore,
    relation: RelationName,
    columns: Vec<Ident>,
    key: Ident,
    key_index: usize,
    retry: &'a RetryPolicy,
}

impl<'a> KeyedResolver<'a> {
    pub fn new(
        store: &'a dyn RelationStore,
        relation: RelationName,
        columns: Vec<Ident>,
        key: Ident,
        retry: &'a RetryPolicy,
    ) -> Result<Self> {
        let key_index = columns
            .iter()
            .position(|c| *c == key)
            .ok_or_else(|| Error::invalid_key_column(key.as_str(), "not in the projected columns"))?;
        Ok(Self {
            store,
            relation,
            columns,
            key,
            key_index,
            retry,
        })
    }
}

impl RowResolver for KeyedResolver<'_> {
    fn resolve(&self, candidates: &[i64], retries: &mut u64) -> Result<Vec<Resolved>> {
        let query = LookupQuery {
            relation: self.relation.clone(),
            columns: self.columns.clone(),
            key: self.key.clone(),
            candidates: distinct(candidates),
        };
        debug!(
            sql = query.statement().sql(),
            candidates = query.candidates.len(),
            "resolving batch"
        );
        let found = self
            .retry
            .run("lookup_keys", retries, || self.store.lookup_keys(&query))?;
        if found.num_columns() != self.columns.len() {
            return Err(Error::schema_mismatch(format!(
                "lookup returned {} columns, expected {}",
                found.num_columns(),
                self.columns.len()
            )));
        }
        Ok(found
            .to_records()?
            .into_iter()
            .filter_map(|record| {
                let identity = record.get(self.key_index)?.as_i64()?;
                Some(Resolved { identity, record })
            })
            .collect())
    }
}

/// Lookup by synthetic position in a materialised working view. The position is
/// the view's last column and is cut from every resolved record.
pub struct PositionalResolver<'a> {
    working: &'a Table,
    columns: Vec<Ident>,
    position_index: usize,
}

impl<'a> PositionalResolver<'a> {
    pub fn new(working: &'a Table, columns: Vec<Ident>) -> Result<Self> {
        if working.num_columns() != columns.len() + 1 {
            return Err(Error::schema_mismatch(format!(
                "working view has {} columns, expected {}",
                working.num_columns(),
                columns.len() + 1
            )));
        }
        Ok(Self {
            working,
            position_index: columns.len(),
            columns,
        })
    }

    pub fn row_count(&self) -> usize {
        self.working.row_count()
    }
}

impl RowResolver for PositionalResolver<'_> {
    fn resolve(&self, candidates: &[i64], _retries: &mut u64) -> Result<Vec<Resolved>> {
        let keys: FxHashSet<i64> = candidates.iter().copied().collect();
        debug!(
            sql = positional_lookup_statement(&self.columns, &[]).sql(),
            candidates = keys.len(),
            "resolving positions"
        );
        let positions = self
            .working
            .column(self.position_index)
            .ok_or_else(|| Error::internal("working view lost its position column"))?;
        positions
            .positions_in(&keys)
            .into_iter()
            .map(|row| {
                let identity = positions
                    .i64_at(row)
                    .ok_or_else(|| Error::internal(format!("NULL position at row {}", row)))?;
                let mut values = self.working.get_row(row)?.into_values();
                values.truncate(self.position_index);
                Ok(Resolved {
                    identity,
                    record: Record::from_values(values),
                })
            })
            .collect()
    }
}
