use thiserror::Error;

use crate::table::CdmTable;

#[derive(Debug, Error)]
pub enum OmopError {
    #[error("column {column} is not part of the {table} header")]
    UnknownColumn { table: CdmTable, column: String },
    #[error("column {column} of {table} expects {expected}")]
    TypeMismatch {
        table: CdmTable,
        column: String,
        expected: &'static str,
    },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, OmopError>;
