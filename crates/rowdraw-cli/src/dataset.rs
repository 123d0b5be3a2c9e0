//! JSON dataset files loaded into a catalog.
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "items", "columns": [{ "name": "id", "type": "INT64", "required": true }],
//!       "rows": [[1], [2]], "analyze": true }
//!   ],
//!   "views": [{ "name": "item_ids", "base": "items", "columns": ["id"] }]
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use rowdraw::{Catalog, DataType, Field, Schema, TableName, Value};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub views: Vec<ViewDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Gather statistics after loading.
    #[serde(default)]
    pub analyze: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewDef {
    pub name: String,
    pub base: String,
    pub columns: Vec<String>,
}

impl Dataset {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse dataset")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Creates every table, then every view, in `catalog`.
    pub fn load_into(&self, catalog: &Catalog) -> Result<()> {
        for table in &self.tables {
            load_table(catalog, table)
                .with_context(|| format!("Failed to load table {}", table.name))?;
        }
        for view in &self.views {
            catalog
                .create_view(
                    &TableName::parse(&view.name),
                    &TableName::parse(&view.base),
                    view.columns.clone(),
                )
                .with_context(|| format!("Failed to create view {}", view.name))?;
        }
        Ok(())
    }
}

fn load_table(catalog: &Catalog, def: &TableDef) -> Result<()> {
    let name = TableName::parse(&def.name);
    let mut types = Vec::with_capacity(def.columns.len());
    let mut fields = Vec::with_capacity(def.columns.len());
    for column in &def.columns {
        let data_type = DataType::from_str(&column.data_type)?;
        types.push(data_type.clone());
        fields.push(if column.required {
            Field::required(column.name.as_str(), data_type)
        } else {
            Field::nullable(column.name.as_str(), data_type)
        });
    }
    catalog.create_table(&name, Schema::from_fields(fields))?;

    let mut rows = Vec::with_capacity(def.rows.len());
    for (index, row) in def.rows.iter().enumerate() {
        if row.len() != types.len() {
            bail!(
                "row {} has {} values, expected {}",
                index,
                row.len(),
                types.len()
            );
        }
        let values = row
            .iter()
            .zip(&types)
            .map(|(json, data_type)| Value::from_json(json, data_type))
            .collect::<rowdraw::Result<Vec<_>>>()
            .with_context(|| format!("row {}", index))?;
        rows.push(values);
    }
    let inserted = catalog.insert_rows(&name, rows)?;
    debug!(table = %name, rows = inserted, "loaded table");

    if def.analyze {
        catalog.analyze(&name)?;
    }
    Ok(())
}
