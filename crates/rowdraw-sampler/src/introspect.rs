use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::DataType;
use rowdraw_storage::Schema;
use tracing::{debug, instrument};

use crate::query::DescribeQuery;
use crate::retry::RetryPolicy;
use crate::sql::{Ident, POSITION_COLUMN, RelationName};
use crate::store::RelationStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: Ident,
    /// 1-based declaration position.
    pub ordinal: usize,
    pub data_type: DataType,
    pub nullable: bool,
}

/// A relation and its declared columns, fixed for the duration of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationHandle {
    relation: RelationName,
    schema: Schema,
    columns: Vec<ColumnDescriptor>,
}

impl RelationHandle {
    pub fn new(relation: RelationName, schema: Schema) -> Result<Self> {
        schema.validate()?;
        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if f.name == POSITION_COLUMN {
                    return Err(Error::invalid_identifier(format!(
                        "column name {} is reserved",
                        POSITION_COLUMN
                    )));
                }
                Ok(ColumnDescriptor {
                    name: Ident::new(f.name.clone())?,
                    ordinal: i + 1,
                    data_type: f.data_type.clone(),
                    nullable: f.is_nullable(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            relation,
            schema,
            columns,
        })
    }

    pub fn relation(&self) -> &RelationName {
        &self.relation
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn idents(&self) -> Vec<Ident> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.as_str() == name)
    }

    /// The named column, provided it exists and holds integers.
    pub fn key_column(&self, name: &str) -> Result<&ColumnDescriptor> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::invalid_key_column(name, format!("no such column in {}", self.relation)))?;
        if !column.data_type.is_integer() {
            return Err(Error::invalid_key_column(
                name,
                format!("expected an integer column, got {}", column.data_type),
            ));
        }
        Ok(column)
    }
}

#[instrument(skip_all, fields(relation = %relation))]
pub fn introspect(
    store: &dyn RelationStore,
    relation: &RelationName,
    retry: &RetryPolicy,
    retries: &mut u64,
) -> Result<RelationHandle> {
    let query = DescribeQuery {
        relation: relation.clone(),
    };
    let stmt = query.statement();
    debug!(sql = stmt.sql(), params = stmt.params().len(), "describing relation");
    let schema = retry.run("describe", retries, || store.describe(&query))?;
    RelationHandle::new(relation.clone(), schema)
}

/// Declared columns of `relation` in order.
pub fn columns(store: &dyn RelationStore, relation: &RelationName) -> Result<Vec<ColumnDescriptor>> {
    let mut retries = 0;
    introspect(store, relation, &RetryPolicy::default(), &mut retries).map(|h| h.columns)
}

#[cfg(test)]
mod tests {
    use rowdraw_common::types::Value;
    use rowdraw_storage::{Catalog, Field, TableName};

    use super::*;

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .create_table(
                &TableName::new(None, "events"),
                Schema::from_fields(vec![
                    Field::required("id", DataType::Int64),
                    Field::nullable("kind", DataType::String),
                    Field::nullable("weight", DataType::Float64),
                    Field::nullable("we\"ird", DataType::Bool),
                ]),
            )
            .unwrap();
        catalog
            .insert_rows(
                &TableName::new(None, "events"),
                vec![vec![
                    Value::Int64(1),
                    Value::string("a"),
                    Value::float64(1.0),
                    Value::Bool(true),
                ]],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_columns_in_declaration_order() {
        let cols = columns(&catalog(), &RelationName::parse("events").unwrap()).unwrap();
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "kind", "weight", "we\"ird"]);
        assert_eq!(cols[2].ordinal, 3);
        assert!(!cols[0].nullable);
    }

    #[test]
    fn test_idents_are_quoted_in_order() {
        let mut retries = 0;
        let handle = introspect(
            &catalog(),
            &RelationName::parse("events").unwrap(),
            &RetryPolicy::none(),
            &mut retries,
        )
        .unwrap();
        let quoted: Vec<String> = handle.idents().iter().map(|i| i.quoted()).collect();
        assert_eq!(quoted, vec!["\"id\"", "\"kind\"", "\"weight\"", "\"we\"\"ird\""]);
    }

    #[test]
    fn test_introspection_is_idempotent() {
        let catalog = catalog();
        let rel = RelationName::parse("events").unwrap();
        assert_eq!(columns(&catalog, &rel).unwrap(), columns(&catalog, &rel).unwrap());
    }

    #[test]
    fn test_unknown_relation() {
        let err = columns(&catalog(), &RelationName::parse("missing").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnknownRelation(_)));
    }

    #[test]
    fn test_key_column_validation() {
        let mut retries = 0;
        let handle = introspect(
            &catalog(),
            &RelationName::parse("events").unwrap(),
            &RetryPolicy::none(),
            &mut retries,
        )
        .unwrap();
        assert_eq!(handle.key_column("id").unwrap().ordinal, 1);
        assert!(matches!(
            handle.key_column("kind"),
            Err(Error::InvalidKeyColumn { .. })
        ));
        assert!(matches!(
            handle.key_column("weight"),
            Err(Error::InvalidKeyColumn { .. })
        ));
        assert!(matches!(
            handle.key_column("nope"),
            Err(Error::InvalidKeyColumn { .. })
        ));
    }

    #[test]
    fn test_reserved_column_rejected() {
        let schema = Schema::from_fields(vec![Field::nullable(POSITION_COLUMN, DataType::Int64)]);
        let err = RelationHandle::new(RelationName::parse("t").unwrap(), schema).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }
}
