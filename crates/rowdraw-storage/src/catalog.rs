use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::Value;
use rustc_hash::FxHashMap;

use crate::{Schema, Table};

pub const DEFAULT_SCHEMA: &str = "public";

/// Catalog key. Both parts are folded to lowercase, so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    schema: String,
    name: String,
}

impl TableName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.unwrap_or(DEFAULT_SCHEMA).to_lowercase(),
            name: name.to_lowercase(),
        }
    }

    /// Splits on the first `.`; no quoting rules apply here.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, name)) => Self::new(Some(schema), name),
            None => Self::new(None, qualified),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A named projection of a base table. Views carry no statistics of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDefinition {
    pub base: TableName,
    pub columns: Vec<String>,
}

/// Row-count snapshot taken by [`Catalog::analyze`]. Later writes are not reflected.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    pub row_count: usize,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<FxHashMap<TableName, Arc<Table>>>,
    views: RwLock<FxHashMap<TableName, ViewDefinition>>,
    stats: RwLock<FxHashMap<TableName, TableStats>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, name: &TableName, schema: Schema) -> Result<()> {
        schema.validate()?;
        let mut tables = self.tables.write();
        if tables.contains_key(name) || self.views.read().contains_key(name) {
            return Err(Error::invalid_parameter(format!(
                "relation {} already exists",
                name
            )));
        }
        tables.insert(name.clone(), Arc::new(Table::new(schema)));
        Ok(())
    }

    /// Appends rows to a table. Readers holding an earlier snapshot keep seeing it.
    pub fn insert_rows(&self, name: &TableName, rows: Vec<Vec<Value>>) -> Result<usize> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| Error::unknown_relation(name.to_string()))?;
        let count = rows.len();
        Arc::make_mut(table).push_rows(rows)?;
        Ok(count)
    }

    pub fn drop_table(&self, name: &TableName) -> Result<()> {
        if self.tables.write().remove(name).is_none() {
            return Err(Error::unknown_relation(name.to_string()));
        }
        self.stats.write().remove(name);
        Ok(())
    }

    pub fn create_view(&self, name: &TableName, base: &TableName, columns: Vec<String>) -> Result<()> {
        let base_table = self.table(base)?;
        if columns.is_empty() {
            return Err(Error::schema_mismatch(format!("view {} has no columns", name)));
        }
        for column in &columns {
            if base_table.schema().field_index(column).is_none() {
                return Err(Error::column_not_found(format!("{}.{}", base, column)));
            }
        }
        // Lock order is always tables, then views.
        let tables = self.tables.read();
        let mut views = self.views.write();
        if views.contains_key(name) || tables.contains_key(name) {
            return Err(Error::invalid_parameter(format!(
                "relation {} already exists",
                name
            )));
        }
        views.insert(
            name.clone(),
            ViewDefinition {
                base: base.clone(),
                columns,
            },
        );
        Ok(())
    }

    pub fn analyze(&self, name: &TableName) -> Result<TableStats> {
        let table = self.table(name)?;
        let stats = TableStats {
            row_count: table.row_count(),
            analyzed_at: Utc::now(),
        };
        self.stats.write().insert(name.clone(), stats.clone());
        Ok(stats)
    }

    pub fn table_stats(&self, name: &TableName) -> Option<TableStats> {
        self.stats.read().get(name).cloned()
    }

    pub fn contains(&self, name: &TableName) -> bool {
        self.tables.read().contains_key(name) || self.views.read().contains_key(name)
    }

    pub fn is_view(&self, name: &TableName) -> bool {
        self.views.read().contains_key(name)
    }

    pub fn relation_names(&self) -> Vec<TableName> {
        let mut names: Vec<TableName> = self
            .tables
            .read()
            .keys()
            .chain(self.views.read().keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Snapshot of a base table. Views are not resolved here.
    pub fn table(&self, name: &TableName) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_relation(name.to_string()))
    }

    /// Snapshot of a table, or of a view projected over its base table.
    pub fn resolve(&self, name: &TableName) -> Result<Arc<Table>> {
        if let Some(table) = self.tables.read().get(name) {
            return Ok(Arc::clone(table));
        }
        let view = self
            .views
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_relation(name.to_string()))?;
        let base = self.table(&view.base)?;
        let columns: Vec<&str> = view.columns.iter().map(String::as_str).collect();
        Ok(Arc::new(base.project_by_name(&columns)?))
    }

    pub fn schema_of(&self, name: &TableName) -> Result<Schema> {
        self.resolve(name).map(|t| t.schema().clone())
    }
}
