use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::Value;

use super::Column;

impl Column {
    pub fn is_null(&self, index: usize) -> bool {
        with_nulls!(self, |nulls| nulls.is_null(index))
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        if index >= self.len() {
            return Err(Error::internal(format!(
                "Column index {} out of bounds (len: {})",
                index,
                self.len()
            )));
        }
        Ok(self.get_value(index))
    }

    pub fn get_value(&self, index: usize) -> Value {
        if index >= self.len() || self.is_null(index) {
            return Value::Null;
        }

        match self {
            Column::Bool { data, .. } => Value::Bool(data[index]),
            Column::Int64 { data, .. } => Value::Int64(data[index]),
            Column::Float64 { data, .. } => Value::float64(data[index]),
            Column::Numeric { data, .. } => Value::Numeric(data[index]),
            Column::String { data, .. } => Value::String(data[index].clone()),
            Column::Bytes { data, .. } => Value::Bytes(data[index].clone()),
            Column::Date { data, .. } => Value::Date(data[index]),
            Column::DateTime { data, .. } => Value::DateTime(data[index]),
            Column::Timestamp { data, .. } => Value::Timestamp(data[index]),
            Column::Json { data, .. } => Value::Json(data[index].clone()),
        }
    }

    /// Integer at `index`, or `None` for NULL slots and non-INT64 columns.
    #[inline]
    pub fn i64_at(&self, index: usize) -> Option<i64> {
        match self {
            Column::Int64 { data, nulls } if nulls.is_valid(index) => Some(data[index]),
            _ => None,
        }
    }
}
