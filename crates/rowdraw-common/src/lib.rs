//! Common types and error handling for rowdraw.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod result;
pub mod types;

pub use error::{Error, Result};
pub use result::{ColumnInfo, QueryResult, Row};
