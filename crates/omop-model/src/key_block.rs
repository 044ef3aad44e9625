use serde::{Deserialize, Serialize};

use crate::table::CdmTable;

/// Contiguous surrogate ids `[start, start + len)` reserved for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBlock {
    pub table: CdmTable,
    pub start: i64,
    pub len: usize,
}

impl KeyBlock {
    pub fn new(table: CdmTable, start: i64, len: usize) -> Self {
        Self { table, start, len }
    }

    /// First id after the block; what the next allocation yields once the
    /// block has been written.
    pub fn end(&self) -> i64 {
        self.start + self.len as i64
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> {
        self.start..self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_cover_the_half_open_range() {
        let block = KeyBlock::new(CdmTable::Measurement, 7, 3);
        assert_eq!(block.ids().collect::<Vec<_>>(), vec![7, 8, 9]);
        assert_eq!(block.end(), 10);
    }

    #[test]
    fn empty_block_has_no_ids() {
        let block = KeyBlock::new(CdmTable::Person, 1, 0);
        assert!(block.is_empty());
        assert_eq!(block.ids().count(), 0);
    }
}
