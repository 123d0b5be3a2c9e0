use aligned_vec::AVec;
use rowdraw_common::error::{Error, Result};
use rustc_hash::FxHashSet;

use super::Column;

impl Column {
    pub fn gather(&self, indices: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&max_idx) = indices.iter().max()
            && max_idx >= len
        {
            return Err(Error::internal(format!(
                "gather: index {} out of bounds for column of length {}",
                max_idx, len
            )));
        }
        Ok(match self {
            Column::Bool { data, nulls } => Column::Bool {
                data: indices.iter().map(|&i| data[i]).collect(),
                nulls: nulls.gather(indices),
            },
            Column::Int64 { data, nulls } => {
                let mut new_data = AVec::new(64);
                for &idx in indices {
                    new_data.push(data[idx]);
                }
                Column::Int64 {
                    data: new_data,
                    nulls: nulls.gather(indices),
                }
            }
            Column::Float64 { data, nulls } => {
                let mut new_data = AVec::new(64);
                for &idx in indices {
                    new_data.push(data[idx]);
                }
                Column::Float64 {
                    data: new_data,
                    nulls: nulls.gather(indices),
                }
            }
            Column::Numeric { data, nulls } => Column::Numeric {
                data: indices.iter().map(|&i| data[i]).collect(),
                nulls: nulls.gather(indices),
            },
            Column::String { data, nulls } => Column::String {
                data: indices.iter().map(|&i| data[i].clone()).collect(),
                nulls: nulls.gather(indices),
            },
            Column::Bytes { data, nulls } => Column::Bytes {
                data: indices.iter().map(|&i| data[i].clone()).collect(),
                nulls: nulls.gather(indices),
            },
            Column::Date { data, nulls } => Column::Date {
                data: indices.iter().map(|&i| data[i]).collect(),
                nulls: nulls.gather(indices),
            },
            Column::DateTime { data, nulls } => Column::DateTime {
                data: indices.iter().map(|&i| data[i]).collect(),
                nulls: nulls.gather(indices),
            },
            Column::Timestamp { data, nulls } => Column::Timestamp {
                data: indices.iter().map(|&i| data[i]).collect(),
                nulls: nulls.gather(indices),
            },
            Column::Json { data, nulls } => Column::Json {
                data: indices.iter().map(|&i| data[i].clone()).collect(),
                nulls: nulls.gather(indices),
            },
        })
    }

    /// `MIN`/`MAX` over the non-null values of an INT64 column.
    pub fn i64_bounds(&self) -> Option<(i64, i64)> {
        let Column::Int64 { data, nulls } = self else {
            return None;
        };
        data.iter()
            .enumerate()
            .filter(|(i, _)| nulls.is_valid(*i))
            .fold(None, |acc, (_, &v)| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Row indices whose INT64 value is a member of `keys`, in row order.
    pub fn positions_in(&self, keys: &FxHashSet<i64>) -> Vec<usize> {
        let Column::Int64 { data, nulls } = self else {
            return Vec::new();
        };
        data.iter()
            .enumerate()
            .filter(|(i, v)| nulls.is_valid(*i) && keys.contains(*v))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rowdraw_common::types::{DataType, Value};

    use super::*;

    fn int_column(values: &[Option<i64>]) -> Column {
        let mut col = Column::new(&DataType::Int64);
        for v in values {
            col.push(v.map(Value::Int64).unwrap_or(Value::Null)).unwrap();
        }
        col
    }

    #[test]
    fn test_gather_preserves_nulls() {
        let col = int_column(&[Some(1), None, Some(3)]);
        let gathered = col.gather(&[2, 1]).unwrap();
        assert_eq!(gathered.len(), 2);
        assert_eq!(gathered.get_value(0), Value::Int64(3));
        assert_eq!(gathered.get_value(1), Value::Null);
    }

    #[test]
    fn test_gather_out_of_bounds() {
        let col = int_column(&[Some(1)]);
        assert!(col.gather(&[1]).is_err());
    }

    #[test]
    fn test_i64_bounds_ignores_nulls() {
        let col = int_column(&[None, Some(12), Some(-4), None, Some(5)]);
        assert_eq!(col.i64_bounds(), Some((-4, 12)));
        assert_eq!(int_column(&[None, None]).i64_bounds(), None);
        assert_eq!(Column::new(&DataType::String).i64_bounds(), None);
    }

    #[test]
    fn test_positions_in() {
        let col = int_column(&[Some(1), Some(5), None, Some(10), Some(12)]);
        let keys: FxHashSet<i64> = [5, 12, 7].into_iter().collect();
        assert_eq!(col.positions_in(&keys), vec![1, 4]);
    }
}
