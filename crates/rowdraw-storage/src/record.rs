use rowdraw_common::result::Row;
use rowdraw_common::types::Value;

use crate::Schema;

/// One materialized row, positionally aligned with a [`Schema`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name<'a>(&'a self, schema: &'a Schema, column: &str) -> Option<&'a Value> {
        schema
            .field_index(column)
            .and_then(|idx| self.values.get(idx))
    }
}

impl From<Record> for Row {
    fn from(record: Record) -> Self {
        Row::new(record.into_values())
    }
}

impl std::ops::Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
