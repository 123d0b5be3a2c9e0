mod bitmap;
mod catalog;
mod column;
mod record;
mod schema;
mod table;

pub use bitmap::NullBitmap;
pub use catalog::{Catalog, DEFAULT_SCHEMA, TableName, TableStats, ViewDefinition};
pub use column::{A64, Column};
pub use record::Record;
pub use schema::{Field, FieldMode, Schema};
pub use table::Table;
