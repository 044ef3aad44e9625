//! Turns typed rows into a full-header frame and appends it with fresh keys.

use anyhow::{Context, Result, bail};
use omop_model::{CdmRow, CdmTable, CdmValue, ColumnKind, KeyBlock};
use omop_store::CdmStore;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use tracing::debug;

use crate::keys;

/// Rows for one table, in key order.
#[derive(Debug, Clone)]
pub struct TableBatch {
    pub table: CdmTable,
    pub rows: Vec<CdmRow>,
}

impl TableBatch {
    pub fn new(table: CdmTable) -> Self {
        Self {
            table,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: CdmRow) -> Result<()> {
        if row.table() != self.table {
            bail!("{} row pushed to {} batch", row.table(), self.table);
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Frame with exactly the table header. Columns the rows never set are
    /// null; dates travel as ISO text and are cast by the store.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .table
            .columns()
            .iter()
            .map(|def| {
                let cells = self.rows.iter().map(|row| row.get(def.name));
                let series = match def.kind {
                    ColumnKind::Int => Series::new(
                        def.name.into(),
                        cells
                            .map(|v| v.and_then(CdmValue::as_i64))
                            .collect::<Vec<_>>(),
                    ),
                    ColumnKind::Float => Series::new(
                        def.name.into(),
                        cells
                            .map(|v| v.and_then(CdmValue::as_f64))
                            .collect::<Vec<_>>(),
                    ),
                    ColumnKind::Text | ColumnKind::Date | ColumnKind::DateTime => Series::new(
                        def.name.into(),
                        cells.map(|v| v.map(CdmValue::to_text)).collect::<Vec<_>>(),
                    ),
                };
                series.into()
            })
            .collect();
        DataFrame::new(columns).with_context(|| format!("build {} frame", self.table))
    }
}

/// Allocates keys for the batch, stamps them on the rows in order and
/// appends the batch. Returns the block that was used.
pub fn write_batch(store: &mut dyn CdmStore, mut batch: TableBatch) -> Result<KeyBlock> {
    let block = keys::allocate(store, batch.table, batch.len())?;
    if batch.is_empty() {
        return Ok(block);
    }
    let key = batch.table.primary_key();
    for (row, id) in batch.rows.iter_mut().zip(block.ids()) {
        row.set(key, id)?;
    }
    let frame = batch.to_frame()?;
    let written = store
        .append(batch.table, &frame)
        .with_context(|| format!("append to {}", batch.table))?;
    debug!(table = %batch.table, first_id = block.start, rows = written, "batch written");
    Ok(block)
}
