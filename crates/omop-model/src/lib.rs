pub mod concept;
pub mod error;
pub mod key_block;
pub mod record;
pub mod report;
pub mod table;

pub use concept::{ConceptId, YesNo};
pub use error::{OmopError, Result};
pub use key_block::KeyBlock;
pub use record::{CdmRow, CdmValue};
pub use report::{RunSummary, TableReport};
pub use table::{CdmTable, ColumnDef, ColumnKind};
