//! Table populators.
//!
//! Each populator owns one slice of the source columns (its column grammar),
//! turns the matching cells into CDM rows and appends them to its target
//! table(s).
//!
//! # Architecture
//!
//! The [`Populator`] trait is the common interface. [`default_populators`]
//! returns them in the order the pipeline runs them: the ICU visit first so
//! later stages can rely on visits existing, then the fact tables.
//!
//! Family-driven populators share one flow:
//!
//! 1. discover variable families with a [`FamilyGrammar`](crate::pattern::FamilyGrammar)
//! 2. reshape them into fact candidates
//! 3. apply the availability gate and populator-specific rules
//! 4. resolve the event date, then the concept
//! 5. allocate keys and write the batch

pub mod common;
pub mod condition;
pub mod drug;
pub mod measurement;
pub mod observation;
pub mod procedure;
pub mod visit;

use anyhow::Result;
use omop_ingest::SourceTable;
use omop_model::TableReport;
use omop_store::CdmStore;

use crate::context::PopulateContext;

pub use condition::ConditionPopulator;
pub use drug::DrugPopulator;
pub use measurement::MeasurementPopulator;
pub use observation::ObservationPopulator;
pub use procedure::ProcedurePopulator;
pub use visit::IcuVisitPopulator;

/// One stage of the mapping.
///
/// # Implementing a Populator
///
/// A populator should:
/// 1. read only the columns its grammar matches plus the row-level columns
///    its date chain names
/// 2. skip rows whose `person_id` is missing
/// 3. write each target table in a single batch so keys stay contiguous
/// 4. return one [`TableReport`] per target table, including empty ones
///
/// # Example
///
/// ```ignore
/// struct NotesPopulator;
///
/// impl Populator for NotesPopulator {
///     fn name(&self) -> &'static str {
///         "notes"
///     }
///
///     fn populate(
///         &self,
///         source: &SourceTable,
///         store: &mut dyn CdmStore,
///         ctx: &PopulateContext<'_>,
///     ) -> Result<Vec<TableReport>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait Populator {
    /// Stage name used in logs and the run summary.
    fn name(&self) -> &'static str;

    /// Maps `source` into the store.
    ///
    /// # Errors
    ///
    /// Store failures are returned as-is; data problems (unknown variables,
    /// missing dates, unparsable values) are dropped and counted in the
    /// reports instead.
    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>>;
}

/// All populators in run order.
pub fn default_populators() -> Result<Vec<Box<dyn Populator>>> {
    Ok(vec![
        Box::new(IcuVisitPopulator),
        Box::new(ConditionPopulator::new()?),
        Box::new(ObservationPopulator::new()?),
        Box::new(MeasurementPopulator::new()?),
        Box::new(ProcedurePopulator::new()?),
        Box::new(DrugPopulator::new()?),
    ])
}
