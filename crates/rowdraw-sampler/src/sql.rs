//! Identifier quoting and prepared statements.
//!
//! User-supplied names only ever reach SQL text through [`Ident`]; values only ever
//! travel as bound [`Param`]s.

use std::fmt;
use std::str::FromStr;

use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::Value;
use rowdraw_storage::TableName;

/// Column name of the synthetic position on the keyless path.
pub const POSITION_COLUMN: &str = "__rowdraw_pos";

/// Name of the working view the keyless path materialises.
pub const WORKING_VIEW: &str = "__rowdraw_work";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::invalid_identifier("empty identifier"));
        }
        if raw.contains('\0') {
            return Err(Error::invalid_identifier(format!(
                "identifier {:?} contains NUL",
                raw
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

/// Optionally schema-qualified relation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationName {
    schema: Option<Ident>,
    name: Ident,
}

impl RelationName {
    pub fn new(schema: Option<&str>, name: &str) -> Result<Self> {
        Ok(Self {
            schema: schema.map(Ident::new).transpose()?,
            name: Ident::new(name)?,
        })
    }

    /// Parses `name`, `schema.name`, or either part double-quoted with `""` escapes.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = split_qualified(input)?;
        match parts.len() {
            1 => Ok(Self {
                schema: None,
                name: Ident::new(parts.remove(0))?,
            }),
            2 => {
                let name = Ident::new(parts.remove(1))?;
                Ok(Self {
                    schema: Some(Ident::new(parts.remove(0))?),
                    name,
                })
            }
            n => Err(Error::invalid_identifier(format!(
                "{:?} has {} parts, expected at most 2",
                input, n
            ))),
        }
    }

    pub fn schema(&self) -> Option<&Ident> {
        self.schema.as_ref()
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema.quoted(), self.name.quoted()),
            None => self.name.quoted(),
        }
    }

    pub fn table_name(&self) -> TableName {
        TableName::new(self.schema.as_ref().map(Ident::as_str), self.name.as_str())
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

impl FromStr for RelationName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn split_qualified(input: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut chars = input.chars().peekable();
    'parts: loop {
        let mut part = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        part.push('"');
                    }
                    Some('"') => break,
                    Some(c) => part.push(c),
                    None => {
                        return Err(Error::invalid_identifier(format!(
                            "unterminated quote in {:?}",
                            input
                        )));
                    }
                }
            }
            parts.push(part);
            match chars.next() {
                None => break 'parts,
                Some('.') => continue 'parts,
                Some(c) => {
                    return Err(Error::invalid_identifier(format!(
                        "unexpected {:?} after quoted identifier in {:?}",
                        c, input
                    )));
                }
            }
        }
        loop {
            match chars.next() {
                Some('.') => {
                    parts.push(part.trim().to_string());
                    continue 'parts;
                }
                Some('"') => {
                    return Err(Error::invalid_identifier(format!(
                        "stray quote in {:?}",
                        input
                    )));
                }
                Some(c) => part.push(c),
                None => {
                    parts.push(part.trim().to_string());
                    break 'parts;
                }
            }
        }
    }
    Ok(parts)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Scalar(Value),
    Int64Array(Vec<i64>),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Scalar(v) => write!(f, "{}", v),
            Param::Int64Array(values) => write!(f, "INT64[{}]", values.len()),
        }
    }
}

/// SQL text with `$n` placeholders plus the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    sql: String,
    params: Vec<Param>,
}

impl PreparedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl fmt::Display for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        for (i, param) in self.params.iter().enumerate() {
            write!(f, "\n  ${} = {}", i + 1, param)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StatementBuilder {
    sql: String,
    params: Vec<Param>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(mut self, text: &str) -> Self {
        self.sql.push_str(text);
        self
    }

    pub fn ident(mut self, ident: &Ident) -> Self {
        self.sql.push_str(&ident.quoted());
        self
    }

    pub fn idents(mut self, idents: &[Ident]) -> Self {
        let list = idents
            .iter()
            .map(Ident::quoted)
            .collect::<Vec<_>>()
            .join(", ");
        self.sql.push_str(&list);
        self
    }

    pub fn relation(mut self, relation: &RelationName) -> Self {
        self.sql.push_str(&relation.quoted());
        self
    }

    pub fn bind(mut self, param: Param) -> Self {
        self.params.push(param);
        self.sql.push_str(&format!("${}", self.params.len()));
        self
    }

    pub fn build(self) -> PreparedStatement {
        PreparedStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

pub fn describe_statement(relation: &RelationName) -> PreparedStatement {
    let schema = relation
        .schema()
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| rowdraw_storage::DEFAULT_SCHEMA.to_string());
    StatementBuilder::new()
        .sql("SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_schema = ")
        .bind(Param::Scalar(Value::string(schema)))
        .sql(" AND table_name = ")
        .bind(Param::Scalar(Value::string(relation.name().as_str())))
        .sql(" ORDER BY ordinal_position")
        .build()
}

pub fn key_bounds_statement(relation: &RelationName, key: &Ident) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT MIN(")
        .ident(key)
        .sql("), MAX(")
        .ident(key)
        .sql(") FROM ")
        .relation(relation)
        .build()
}

pub fn row_estimate_statement(relation: &RelationName) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT reltuples::bigint FROM pg_class WHERE oid = ")
        .bind(Param::Scalar(Value::string(relation.quoted())))
        .sql("::regclass")
        .build()
}

pub fn row_count_statement(relation: &RelationName) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT COUNT(*) FROM ")
        .relation(relation)
        .build()
}

/// Semi-join of the relation against a candidate array: each matching row comes back once.
pub fn lookup_statement(
    relation: &RelationName,
    columns: &[Ident],
    key: &Ident,
    candidates: &[i64],
) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT ")
        .idents(columns)
        .sql(" FROM ")
        .relation(relation)
        .sql(" WHERE ")
        .ident(key)
        .sql(" = ANY(")
        .bind(Param::Int64Array(candidates.to_vec()))
        .sql(")")
        .build()
}

pub fn materialize_statement(relation: &RelationName, columns: &[Ident]) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT ")
        .idents(columns)
        .sql(", ROW_NUMBER() OVER () AS ")
        .sql(&format!("\"{}\"", POSITION_COLUMN))
        .sql(" FROM ")
        .relation(relation)
        .build()
}

pub fn positional_lookup_statement(columns: &[Ident], candidates: &[i64]) -> PreparedStatement {
    StatementBuilder::new()
        .sql("SELECT ")
        .idents(columns)
        .sql(&format!(
            " FROM \"{}\" WHERE \"{}\" = ANY(",
            WORKING_VIEW, POSITION_COLUMN
        ))
        .bind(Param::Int64Array(candidates.to_vec()))
        .sql(")")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| Ident::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_ident_quoting() {
        assert_eq!(Ident::new("id").unwrap().quoted(), "\"id\"");
        assert_eq!(
            Ident::new("x\"; DROP TABLE t; --").unwrap().quoted(),
            "\"x\"\"; DROP TABLE t; --\""
        );
        assert!(matches!(Ident::new(""), Err(Error::InvalidIdentifier(_))));
        assert!(matches!(Ident::new("a\0b"), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_parse_relation_names() {
        let plain = RelationName::parse("users").unwrap();
        assert!(plain.schema().is_none());
        assert_eq!(plain.quoted(), "\"users\"");

        let qualified = RelationName::parse("sales.orders").unwrap();
        assert_eq!(qualified.schema().map(Ident::as_str), Some("sales"));
        assert_eq!(qualified.quoted(), "\"sales\".\"orders\"");

        let quoted = RelationName::parse("\"my.schema\".\"odd\"\"name\"").unwrap();
        assert_eq!(quoted.schema().map(Ident::as_str), Some("my.schema"));
        assert_eq!(quoted.name().as_str(), "odd\"name");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for bad in ["a.b.c", "\"open", "", "a.", "\"a\"b", "a\"b"] {
            assert!(
                matches!(RelationName::parse(bad), Err(Error::InvalidIdentifier(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_table_name_conversion() {
        let rel: RelationName = "Sales.Orders".parse().unwrap();
        assert_eq!(rel.table_name(), TableName::new(Some("sales"), "orders"));
        let rel = RelationName::parse("t").unwrap();
        assert_eq!(rel.table_name().schema(), "public");
    }

    #[test]
    fn test_builder_numbers_placeholders() {
        let stmt = StatementBuilder::new()
            .sql("SELECT 1 WHERE a = ")
            .bind(Param::Scalar(Value::Int64(1)))
            .sql(" AND b = ")
            .bind(Param::Scalar(Value::string("x")))
            .build();
        assert_eq!(stmt.sql(), "SELECT 1 WHERE a = $1 AND b = $2");
        assert_eq!(stmt.params().len(), 2);
    }

    #[test]
    fn test_describe_binds_relation_as_values() {
        let rel = RelationName::parse("users'; --").unwrap();
        let stmt = describe_statement(&rel);
        assert!(!stmt.sql().contains("users"));
        assert_eq!(
            stmt.params(),
            &[
                Param::Scalar(Value::string("public")),
                Param::Scalar(Value::string("users'; --")),
            ]
        );
    }

    #[test]
    fn test_lookup_statement() {
        let rel = RelationName::parse("public.items").unwrap();
        let stmt = lookup_statement(&rel, &idents(&["id", "label"]), &Ident::new("id").unwrap(), &[3, 9]);
        assert_eq!(
            stmt.sql(),
            "SELECT \"id\", \"label\" FROM \"public\".\"items\" WHERE \"id\" = ANY($1)"
        );
        assert_eq!(stmt.params(), &[Param::Int64Array(vec![3, 9])]);
    }

    #[test]
    fn test_aggregate_statements() {
        let rel = RelationName::parse("items").unwrap();
        let key = Ident::new("id").unwrap();
        assert_eq!(
            key_bounds_statement(&rel, &key).sql(),
            "SELECT MIN(\"id\"), MAX(\"id\") FROM \"items\""
        );
        assert_eq!(row_count_statement(&rel).sql(), "SELECT COUNT(*) FROM \"items\"");
        assert_eq!(
            row_estimate_statement(&rel).params(),
            &[Param::Scalar(Value::string("\"items\""))]
        );
    }

    #[test]
    fn test_materialize_statements() {
        let rel = RelationName::parse("notes").unwrap();
        let cols = idents(&["body"]);
        assert_eq!(
            materialize_statement(&rel, &cols).sql(),
            "SELECT \"body\", ROW_NUMBER() OVER () AS \"__rowdraw_pos\" FROM \"notes\""
        );
        assert_eq!(
            positional_lookup_statement(&cols, &[1]).sql(),
            "SELECT \"body\" FROM \"__rowdraw_work\" WHERE \"__rowdraw_pos\" = ANY($1)"
        );
    }

    #[test]
    fn test_statement_display_hides_array_contents() {
        let rel = RelationName::parse("t").unwrap();
        let stmt = lookup_statement(&rel, &idents(&["k"]), &Ident::new("k").unwrap(), &[1, 2, 3]);
        assert!(stmt.to_string().ends_with("$1 = INT64[3]"));
    }
}
