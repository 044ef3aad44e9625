//! Surrogate key allocation: `1 + MAX(primary key)` of the target table.
//!
//! Nothing is reserved in the database, so two runs against one database
//! must not overlap.

use anyhow::{Context, Result};
use omop_model::{CdmTable, KeyBlock};
use omop_store::CdmStore;

pub fn next_id(store: &dyn CdmStore, table: CdmTable) -> Result<i64> {
    let max = store
        .max_value(table, table.primary_key())
        .with_context(|| format!("read max {} of {table}", table.primary_key()))?;
    Ok(max.map_or(1, |max| max + 1))
}

/// Reserves `len` ids for the next batch of `table`. Calling it again
/// before the batch is written returns the same block.
pub fn allocate(store: &dyn CdmStore, table: CdmTable, len: usize) -> Result<KeyBlock> {
    Ok(KeyBlock::new(table, next_id(store, table)?, len))
}

#[cfg(test)]
mod tests {
    use omop_store::DuckDbStore;

    use super::*;

    #[test]
    fn empty_table_starts_at_one() {
        let store = DuckDbStore::open_in_memory().unwrap();
        assert_eq!(next_id(&store, CdmTable::Measurement).unwrap(), 1);
    }

    #[test]
    fn allocation_is_idempotent_on_an_unchanged_table() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let first = allocate(&store, CdmTable::ConditionOccurrence, 4).unwrap();
        let second = allocate(&store, CdmTable::ConditionOccurrence, 4).unwrap();
        assert_eq!(first, second);
    }
}
