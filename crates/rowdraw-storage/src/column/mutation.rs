use rust_decimal::Decimal;
use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::Value;

use super::Column;

impl Column {
    pub fn push(&mut self, value: Value) -> Result<()> {
        let expected = self.data_type();
        match (self, value) {
            (Column::Bool { data, nulls }, Value::Null) => {
                data.push(false);
                nulls.push(true);
            }
            (Column::Bool { data, nulls }, Value::Bool(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Int64 { data, nulls }, Value::Null) => {
                data.push(0);
                nulls.push(true);
            }
            (Column::Int64 { data, nulls }, Value::Int64(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Int64 { data, nulls }, Value::String(v)) => {
                let n = v
                    .parse::<i64>()
                    .map_err(|_| Error::type_mismatch("INT64", format!("STRING '{}'", v)))?;
                data.push(n);
                nulls.push(false);
            }
            (Column::Float64 { data, nulls }, Value::Null) => {
                data.push(0.0);
                nulls.push(true);
            }
            (Column::Float64 { data, nulls }, Value::Float64(v)) => {
                data.push(v.0);
                nulls.push(false);
            }
            (Column::Float64 { data, nulls }, Value::Int64(v)) => {
                data.push(v as f64);
                nulls.push(false);
            }
            (Column::Numeric { data, nulls }, Value::Null) => {
                data.push(Decimal::ZERO);
                nulls.push(true);
            }
            (Column::Numeric { data, nulls }, Value::Numeric(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Numeric { data, nulls }, Value::Int64(v)) => {
                data.push(Decimal::from(v));
                nulls.push(false);
            }
            (Column::String { data, nulls }, Value::Null) => {
                data.push(String::new());
                nulls.push(true);
            }
            (Column::String { data, nulls }, Value::String(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Bytes { data, nulls }, Value::Null) => {
                data.push(Vec::new());
                nulls.push(true);
            }
            (Column::Bytes { data, nulls }, Value::Bytes(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Date { data, nulls }, Value::Null) => {
                data.push(chrono::NaiveDate::default());
                nulls.push(true);
            }
            (Column::Date { data, nulls }, Value::Date(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::DateTime { data, nulls }, Value::Null) => {
                data.push(chrono::NaiveDateTime::default());
                nulls.push(true);
            }
            (Column::DateTime { data, nulls }, Value::DateTime(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Timestamp { data, nulls }, Value::Null) => {
                data.push(chrono::DateTime::<chrono::Utc>::default());
                nulls.push(true);
            }
            (Column::Timestamp { data, nulls }, Value::Timestamp(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (Column::Json { data, nulls }, Value::Null) => {
                data.push(serde_json::Value::Null);
                nulls.push(true);
            }
            (Column::Json { data, nulls }, Value::Json(v)) => {
                data.push(v);
                nulls.push(false);
            }
            (_, other) => {
                return Err(Error::type_mismatch(
                    expected.to_string(),
                    other.data_type().to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        match self {
            Column::Bool { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Int64 { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Float64 { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Numeric { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::String { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Bytes { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Date { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::DateTime { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Timestamp { data, nulls } => {
                data.clear();
                nulls.clear();
            }
            Column::Json { data, nulls } => {
                data.clear();
                nulls.clear();
            }
        }
    }
}
