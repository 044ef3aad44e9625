//! Storage boundary for CDM tables.
//!
//! The mapping engine only needs three operations: the maximum of a key
//! column, a filtered select, and an append. Nothing is updated or deleted.

pub mod duckdb_store;
pub mod error;
pub mod predicate;
pub mod schema;

use omop_model::CdmTable;
use polars::prelude::DataFrame;

pub use duckdb_store::DuckDbStore;
pub use error::{Result, StoreError};
pub use predicate::Predicate;

pub trait CdmStore {
    /// `MAX(column)` over the table; `None` when the table is empty.
    fn max_value(&self, table: CdmTable, column: &str) -> Result<Option<i64>>;

    /// Selected columns (all of them when `columns` is empty) of the rows
    /// matching `predicate`, every value rendered as nullable text.
    fn select(&self, table: CdmTable, columns: &[&str], predicate: &Predicate)
    -> Result<DataFrame>;

    /// Appends a batch in one transaction and returns the number of rows
    /// written. Frame columns must belong to the table header.
    fn append(&mut self, table: CdmTable, frame: &DataFrame) -> Result<usize>;
}
