use omop_model::CdmTable;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("column {column} is not part of the {table} header")]
    UnknownColumn { table: CdmTable, column: String },

    #[error("column {column} of {table} is not an integer column")]
    NotInteger { table: CdmTable, column: String },

    #[error("unsupported value for {table}.{column}: {value}")]
    UnsupportedValue {
        table: CdmTable,
        column: String,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
