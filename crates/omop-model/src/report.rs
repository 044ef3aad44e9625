use serde::{Deserialize, Serialize};

use crate::table::CdmTable;

/// Outcome of one populator (or identity resolver) writing one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableReport {
    pub table: Option<CdmTable>,
    /// Name of the stage that produced the batch, e.g. "measurement" or "icu".
    pub stage: String,
    pub candidates: usize,
    pub written: usize,
    pub dropped_unavailable: usize,
    pub dropped_no_date: usize,
    pub dropped_no_concept: usize,
    pub truncated: usize,
    /// Variables matched by the column grammar but absent from the registry.
    pub unmapped_variables: Vec<String>,
    pub first_id: Option<i64>,
}

impl TableReport {
    pub fn new(stage: impl Into<String>, table: CdmTable) -> Self {
        Self {
            table: Some(table),
            stage: stage.into(),
            ..Self::default()
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped_unavailable + self.dropped_no_date + self.dropped_no_concept
    }

    pub fn warning_count(&self) -> usize {
        usize::from(self.dropped_no_date > 0)
            + usize::from(self.dropped_no_concept > 0)
            + usize::from(self.truncated > 0)
            + usize::from(!self.unmapped_variables.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub source: String,
    pub source_rows: usize,
    pub persons: usize,
    pub tables: Vec<TableReport>,
}

impl RunSummary {
    pub fn total_written(&self) -> usize {
        self.tables.iter().map(|report| report.written).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.tables.iter().map(TableReport::dropped).sum()
    }
}
