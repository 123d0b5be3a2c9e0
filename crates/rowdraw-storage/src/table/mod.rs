use std::sync::Arc;

use indexmap::IndexMap;
use rowdraw_common::error::{Error, Result};
use rowdraw_common::result::{ColumnInfo, QueryResult, Row};
use rowdraw_common::types::Value;

use crate::{Column, Field, Record, Schema};

/// Columnar relation. Columns are shared copy-on-write, so cloning a table and
/// then writing to one copy leaves readers of the other untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    columns: IndexMap<String, Arc<Column>>,
    row_count: usize,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), Arc::new(Column::new(&f.data_type))))
            .collect();
        Self {
            schema,
            columns,
            row_count: 0,
        }
    }

    pub fn from_values(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(schema);
        table.push_rows(rows)?;
        Ok(table)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get_index(idx).map(|(_, c)| c.as_ref())
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(|c| c.as_ref())
    }

    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        self.push_rows(vec![values])
    }

    /// Appends all rows or none of them.
    pub fn push_rows(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = self.columns.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(Error::schema_mismatch(format!(
                "row has {} values, table has {} columns",
                bad.len(),
                width
            )));
        }

        let num_rows = rows.len();
        let mut columns_data: Vec<Vec<Value>> = vec![Vec::with_capacity(num_rows); width];
        for row in rows {
            for (col_idx, value) in row.into_iter().enumerate() {
                columns_data[col_idx].push(value);
            }
        }

        let mut staged = self.columns.clone();
        for (col, values) in staged.values_mut().zip(columns_data) {
            let col_mut = Arc::make_mut(col);
            for value in values {
                col_mut.push(value)?;
            }
        }

        self.columns = staged;
        self.row_count += num_rows;
        Ok(())
    }

    pub fn get_row(&self, index: usize) -> Result<Record> {
        if index >= self.row_count {
            return Err(Error::internal(format!(
                "Row index {} out of bounds (count: {})",
                index, self.row_count
            )));
        }
        let values: Vec<Value> = self.columns.values().map(|c| c.get_value(index)).collect();
        Ok(Record::from_values(values))
    }

    pub fn to_records(&self) -> Result<Vec<Record>> {
        (0..self.row_count).map(|i| self.get_row(i)).collect()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn gather_rows(&self, indices: &[usize]) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| Ok((name.clone(), Arc::new(col.gather(indices)?))))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            schema: self.schema.clone(),
            columns,
            row_count: indices.len(),
        })
    }

    /// New table holding the columns at `indices`, in that order. Column data is shared.
    pub fn project(&self, indices: &[usize]) -> Result<Table> {
        let schema = self.schema.project(indices)?;
        let mut columns = IndexMap::with_capacity(indices.len());
        for &idx in indices {
            let (name, col) = self
                .columns
                .get_index(idx)
                .ok_or_else(|| Error::internal(format!("column index {} out of range", idx)))?;
            if columns.insert(name.clone(), Arc::clone(col)).is_some() {
                return Err(Error::schema_mismatch(format!(
                    "column {} projected twice",
                    name
                )));
            }
        }
        Ok(Self {
            schema,
            columns,
            row_count: self.row_count,
        })
    }

    pub fn project_by_name(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| {
                self.schema
                    .field_index(n)
                    .ok_or_else(|| Error::column_not_found(*n))
            })
            .collect::<Result<Vec<_>>>()?;
        self.project(&indices)
    }

    /// New table with `column` added after the existing ones.
    pub fn append_column(&self, field: Field, column: Column) -> Result<Table> {
        if column.len() != self.row_count {
            return Err(Error::schema_mismatch(format!(
                "column {} has {} values, table has {} rows",
                field.name,
                column.len(),
                self.row_count
            )));
        }
        if self.columns.contains_key(&field.name) {
            return Err(Error::schema_mismatch(format!(
                "Duplicate field name: {}",
                field.name
            )));
        }
        let mut schema = self.schema.clone();
        let mut columns = self.columns.clone();
        columns.insert(field.name.clone(), Arc::new(column));
        schema.add_field(field);
        Ok(Self {
            schema,
            columns,
            row_count: self.row_count,
        })
    }

    pub fn to_query_result(&self) -> Result<QueryResult> {
        let schema = self
            .schema
            .fields()
            .iter()
            .map(|f| ColumnInfo::new(f.name.clone(), f.data_type.to_string()))
            .collect();
        let rows = self
            .to_records()?
            .into_iter()
            .map(Row::from)
            .collect();
        Ok(QueryResult::new(schema, rows))
    }
}
