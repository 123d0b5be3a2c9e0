#[macro_use]
mod macros;

mod access;
mod mutation;
mod ops;

use aligned_vec::{AVec, ConstAlign};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rowdraw_common::types::DataType;

use crate::NullBitmap;

pub type A64 = ConstAlign<64>;

/// One typed, null-aware column of a [`Table`](crate::Table).
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Bool {
        data: Vec<bool>,
        nulls: NullBitmap,
    },
    Int64 {
        data: AVec<i64, A64>,
        nulls: NullBitmap,
    },
    Float64 {
        data: AVec<f64, A64>,
        nulls: NullBitmap,
    },
    Numeric {
        data: Vec<Decimal>,
        nulls: NullBitmap,
    },
    String {
        data: Vec<String>,
        nulls: NullBitmap,
    },
    Bytes {
        data: Vec<Vec<u8>>,
        nulls: NullBitmap,
    },
    Date {
        data: Vec<NaiveDate>,
        nulls: NullBitmap,
    },
    DateTime {
        data: Vec<NaiveDateTime>,
        nulls: NullBitmap,
    },
    Timestamp {
        data: Vec<DateTime<Utc>>,
        nulls: NullBitmap,
    },
    Json {
        data: Vec<serde_json::Value>,
        nulls: NullBitmap,
    },
}

impl Column {
    pub fn new(data_type: &DataType) -> Self {
        match data_type {
            DataType::Bool => Column::Bool {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::Int64 => Column::Int64 {
                data: AVec::new(64),
                nulls: NullBitmap::new(),
            },
            DataType::Float64 => Column::Float64 {
                data: AVec::new(64),
                nulls: NullBitmap::new(),
            },
            DataType::Numeric => Column::Numeric {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::String | DataType::Unknown => Column::String {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::Bytes => Column::Bytes {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::Date => Column::Date {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::DateTime => Column::DateTime {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::Timestamp => Column::Timestamp {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
            DataType::Json => Column::Json {
                data: Vec::new(),
                nulls: NullBitmap::new(),
            },
        }
    }

    /// Builds a dense INT64 column from an iterator of non-null values.
    pub fn from_i64s(values: impl IntoIterator<Item = i64>) -> Self {
        let mut data = AVec::new(64);
        let mut nulls = NullBitmap::new();
        for v in values {
            data.push(v);
            nulls.push(false);
        }
        Column::Int64 { data, nulls }
    }

    pub fn len(&self) -> usize {
        for_each_variant!(self, |data| data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Bool { .. } => DataType::Bool,
            Column::Int64 { .. } => DataType::Int64,
            Column::Float64 { .. } => DataType::Float64,
            Column::Numeric { .. } => DataType::Numeric,
            Column::String { .. } => DataType::String,
            Column::Bytes { .. } => DataType::Bytes,
            Column::Date { .. } => DataType::Date,
            Column::DateTime { .. } => DataType::DateTime,
            Column::Timestamp { .. } => DataType::Timestamp,
            Column::Json { .. } => DataType::Json,
        }
    }

    pub fn null_count(&self) -> usize {
        with_nulls!(self, |nulls| nulls.count_null())
    }
}

#[cfg(test)]
mod tests {
    use rowdraw_common::types::Value;

    use super::*;

    #[test]
    fn test_new_column_matches_type() {
        for dt in [
            DataType::Bool,
            DataType::Int64,
            DataType::Float64,
            DataType::Numeric,
            DataType::String,
            DataType::Bytes,
            DataType::Date,
            DataType::DateTime,
            DataType::Timestamp,
            DataType::Json,
        ] {
            let col = Column::new(&dt);
            assert_eq!(col.data_type(), dt);
            assert!(col.is_empty());
        }
        assert_eq!(Column::new(&DataType::Unknown).data_type(), DataType::String);
    }

    #[test]
    fn test_from_i64s() {
        let col = Column::from_i64s([3, 1, 2]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.null_count(), 0);
        assert_eq!(col.get_value(0), Value::Int64(3));
        assert_eq!(col.get_value(2), Value::Int64(2));
    }
}
