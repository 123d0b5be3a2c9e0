use crate::sql::{
    Ident, PreparedStatement, RelationName, describe_statement, key_bounds_statement,
    lookup_statement, materialize_statement, row_count_statement, row_estimate_statement,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeQuery {
    pub relation: RelationName,
}

impl DescribeQuery {
    pub fn statement(&self) -> PreparedStatement {
        describe_statement(&self.relation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyBoundsQuery {
    pub relation: RelationName,
    pub key: Ident,
}

impl KeyBoundsQuery {
    pub fn statement(&self) -> PreparedStatement {
        key_bounds_statement(&self.relation, &self.key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowEstimateQuery {
    pub relation: RelationName,
}

impl RowEstimateQuery {
    pub fn statement(&self) -> PreparedStatement {
        row_estimate_statement(&self.relation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowCountQuery {
    pub relation: RelationName,
}

impl RowCountQuery {
    pub fn statement(&self) -> PreparedStatement {
        row_count_statement(&self.relation)
    }
}

/// Rows of `relation` whose `key` equals one of `candidates`, projected to `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupQuery {
    pub relation: RelationName,
    pub columns: Vec<Ident>,
    pub key: Ident,
    pub candidates: Vec<i64>,
}

impl LookupQuery {
    pub fn statement(&self) -> PreparedStatement {
        lookup_statement(&self.relation, &self.columns, &self.key, &self.candidates)
    }
}

/// Whole relation projected to `columns` plus a dense 1-based position column.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeQuery {
    pub relation: RelationName,
    pub columns: Vec<Ident>,
}

impl MaterializeQuery {
    pub fn statement(&self) -> PreparedStatement {
        materialize_statement(&self.relation, &self.columns)
    }
}
