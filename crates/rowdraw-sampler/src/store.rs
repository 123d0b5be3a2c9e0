use std::sync::Arc;

use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::DataType;
use rowdraw_storage::{Catalog, Column, Field, Schema, Table};
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::query::{
    DescribeQuery, KeyBoundsQuery, LookupQuery, MaterializeQuery, RowCountQuery, RowEstimateQuery,
};
use crate::sql::{Ident, POSITION_COLUMN, PreparedStatement};

/// Everything the sampler needs from a database. Every call is a single read.
pub trait RelationStore: Send + Sync {
    /// Declared columns in ordinal order. `UnknownRelation` when the name does not resolve.
    fn describe(&self, query: &DescribeQuery) -> Result<Schema>;

    /// `MIN`/`MAX` of the key over non-null values, `None` when there are none.
    fn key_bounds(&self, query: &KeyBoundsQuery) -> Result<Option<(i64, i64)>>;

    /// Row count from statistics, `None` when the relation was never analyzed.
    fn row_estimate(&self, query: &RowEstimateQuery) -> Result<Option<u64>>;

    fn row_count(&self, query: &RowCountQuery) -> Result<u64>;

    fn lookup_keys(&self, query: &LookupQuery) -> Result<Table>;

    /// The last column of the returned table is the 1-based position.
    fn materialize(&self, query: &MaterializeQuery) -> Result<Table>;
}

impl<S: RelationStore + ?Sized> RelationStore for Arc<S> {
    fn describe(&self, query: &DescribeQuery) -> Result<Schema> {
        (**self).describe(query)
    }

    fn key_bounds(&self, query: &KeyBoundsQuery) -> Result<Option<(i64, i64)>> {
        (**self).key_bounds(query)
    }

    fn row_estimate(&self, query: &RowEstimateQuery) -> Result<Option<u64>> {
        (**self).row_estimate(query)
    }

    fn row_count(&self, query: &RowCountQuery) -> Result<u64> {
        (**self).row_count(query)
    }

    fn lookup_keys(&self, query: &LookupQuery) -> Result<Table> {
        (**self).lookup_keys(query)
    }

    fn materialize(&self, query: &MaterializeQuery) -> Result<Table> {
        (**self).materialize(query)
    }
}

fn trace_statement(stmt: &PreparedStatement) {
    trace!(sql = stmt.sql(), params = stmt.params().len(), "catalog query");
}

fn project(table: &Table, columns: &[Ident]) -> Result<Table> {
    let names: Vec<&str> = columns.iter().map(Ident::as_str).collect();
    table.project_by_name(&names)
}

fn int_column<'a>(table: &'a Table, key: &Ident) -> Result<&'a Column> {
    let column = table
        .column_by_name(key.as_str())
        .ok_or_else(|| Error::column_not_found(key.as_str()))?;
    if !column.data_type().is_integer() {
        return Err(Error::type_mismatch(
            DataType::Int64.to_string(),
            column.data_type().to_string(),
        ));
    }
    Ok(column)
}

impl RelationStore for Catalog {
    fn describe(&self, query: &DescribeQuery) -> Result<Schema> {
        trace_statement(&query.statement());
        self.schema_of(&query.relation.table_name())
    }

    fn key_bounds(&self, query: &KeyBoundsQuery) -> Result<Option<(i64, i64)>> {
        trace_statement(&query.statement());
        let table = self.resolve(&query.relation.table_name())?;
        Ok(int_column(&table, &query.key)?.i64_bounds())
    }

    fn row_estimate(&self, query: &RowEstimateQuery) -> Result<Option<u64>> {
        trace_statement(&query.statement());
        let name = query.relation.table_name();
        if !self.contains(&name) {
            return Err(Error::unknown_relation(name.to_string()));
        }
        Ok(self.table_stats(&name).map(|s| s.row_count as u64))
    }

    fn row_count(&self, query: &RowCountQuery) -> Result<u64> {
        trace_statement(&query.statement());
        Ok(self.resolve(&query.relation.table_name())?.row_count() as u64)
    }

    fn lookup_keys(&self, query: &LookupQuery) -> Result<Table> {
        trace_statement(&query.statement());
        let table = self.resolve(&query.relation.table_name())?;
        let keys: FxHashSet<i64> = query.candidates.iter().copied().collect();
        let matches = int_column(&table, &query.key)?.positions_in(&keys);
        project(&table, &query.columns)?.gather_rows(&matches)
    }

    fn materialize(&self, query: &MaterializeQuery) -> Result<Table> {
        trace_statement(&query.statement());
        let base = self.resolve(&query.relation.table_name())?;
        let table = project(&base, &query.columns)?;
        let positions = Column::from_i64s(1..=table.row_count() as i64);
        table.append_column(Field::required(POSITION_COLUMN, DataType::Int64), positions)
    }
}

#[cfg(test)]
mod tests {
    use rowdraw_common::types::Value;
    use rowdraw_storage::TableName;

    use super::*;
    use crate::sql::RelationName;

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        let name = TableName::new(None, "items");
        catalog
            .create_table(
                &name,
                Schema::from_fields(vec![
                    Field::nullable("id", DataType::Int64),
                    Field::nullable("label", DataType::String),
                ]),
            )
            .unwrap();
        catalog
            .insert_rows(
                &name,
                vec![
                    vec![Value::Int64(10), Value::string("a")],
                    vec![Value::Null, Value::string("orphan")],
                    vec![Value::Int64(3), Value::string("b")],
                    vec![Value::Int64(7), Value::string("c")],
                ],
            )
            .unwrap();
        catalog
    }

    fn rel() -> RelationName {
        RelationName::parse("items").unwrap()
    }

    fn ident(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    #[test]
    fn test_describe() {
        let schema = catalog().describe(&DescribeQuery { relation: rel() }).unwrap();
        assert_eq!(schema.field_names(), vec!["id", "label"]);
        let missing = catalog().describe(&DescribeQuery {
            relation: RelationName::parse("nope").unwrap(),
        });
        assert!(matches!(missing, Err(Error::UnknownRelation(_))));
    }

    #[test]
    fn test_key_bounds_ignore_nulls() {
        let bounds = catalog()
            .key_bounds(&KeyBoundsQuery {
                relation: rel(),
                key: ident("id"),
            })
            .unwrap();
        assert_eq!(bounds, Some((3, 10)));

        let err = catalog()
            .key_bounds(&KeyBoundsQuery {
                relation: rel(),
                key: ident("label"),
            })
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_row_estimate_requires_analyze() {
        let catalog = catalog();
        let query = RowEstimateQuery { relation: rel() };
        assert_eq!(catalog.row_estimate(&query).unwrap(), None);
        catalog.analyze(&TableName::new(None, "items")).unwrap();
        assert_eq!(catalog.row_estimate(&query).unwrap(), Some(4));
        assert_eq!(catalog.row_count(&RowCountQuery { relation: rel() }).unwrap(), 4);
    }

    #[test]
    fn test_lookup_is_semi_join() {
        let found = catalog()
            .lookup_keys(&LookupQuery {
                relation: rel(),
                columns: vec![ident("id"), ident("label")],
                key: ident("id"),
                candidates: vec![7, 7, 4, 10],
            })
            .unwrap();
        assert_eq!(found.row_count(), 2);
        let keys: Vec<Value> = found
            .to_records()
            .unwrap()
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(keys, vec![Value::Int64(10), Value::Int64(7)]);
    }

    #[test]
    fn test_materialize_appends_positions() {
        let working = catalog()
            .materialize(&MaterializeQuery {
                relation: rel(),
                columns: vec![ident("label")],
            })
            .unwrap();
        assert_eq!(working.schema().field_names(), vec!["label", POSITION_COLUMN]);
        assert_eq!(working.get_row(3).unwrap()[1], Value::Int64(4));
    }

    #[test]
    fn test_materialize_view() {
        let catalog = catalog();
        catalog
            .create_view(
                &TableName::new(None, "labels"),
                &TableName::new(None, "items"),
                vec!["label".to_string(), "id".to_string()],
            )
            .unwrap();
        let working = catalog
            .materialize(&MaterializeQuery {
                relation: RelationName::parse("labels").unwrap(),
                columns: vec![ident("id"), ident("label")],
            })
            .unwrap();
        assert_eq!(working.row_count(), 4);
        assert_eq!(
            working.schema().field_names(),
            vec!["id", "label", POSITION_COLUMN]
        );
        assert_eq!(
            working.get_row(0).unwrap().values(),
            &[Value::Int64(10), Value::string("a"), Value::Int64(1)]
        );
    }

    #[test]
    fn test_arc_store_delegates() {
        let store: Arc<dyn RelationStore> = Arc::new(catalog());
        assert_eq!(store.row_count(&RowCountQuery { relation: rel() }).unwrap(), 4);
    }
}
