use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    UnknownRelation(String),
    InvalidKeyColumn { column: String, reason: String },
    InvalidParameter(String),
    InvalidIdentifier(String),
    ColumnNotFound(String),
    TypeMismatch { expected: String, actual: String },
    SchemaMismatch(String),
    StoreUnavailable(String),
    Cancelled,
    Internal(String),
}

impl Error {
    pub fn unknown_relation(name: impl Into<String>) -> Self {
        Error::UnknownRelation(name.into())
    }

    pub fn invalid_key_column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidKeyColumn {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Error::InvalidIdentifier(msg.into())
    }

    pub fn column_not_found(name: impl Into<String>) -> Self {
        Error::ColumnNotFound(name.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Error::SchemaMismatch(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Error::StoreUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Transient failures are the only ones worth retrying; everything else is a
    /// property of the request or the schema and fails the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownRelation(name) => write!(f, "Unknown relation: {}", name),
            Error::InvalidKeyColumn { column, reason } => {
                write!(f, "Invalid key column {}: {}", column, reason)
            }
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::InvalidIdentifier(msg) => write!(f, "Invalid identifier: {}", msg),
            Error::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            Error::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            Error::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            Error::Cancelled => write!(f, "Sampling cancelled"),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
