//! ICU stays → visit_occurrence, mirrored as "admission to ICU" procedures.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use omop_ingest::{SourceTable, parse_code, parse_date};
use omop_model::{CdmRow, CdmTable, TableReport, YesNo};
use omop_store::CdmStore;
use tracing::warn;

use super::Populator;
use super::common::log_written;
use crate::context::PopulateContext;
use crate::identity::CARE_SITE_ID_COLUMN;
use crate::join::ColumnCache;
use crate::reshape::PERSON_ID_COLUMN;
use crate::writer::{TableBatch, write_batch};

const ICU_FLAG: &str = "icu_hoterm";
const ICU_START: &str = "icu_hostdat";
const ICU_END: &[&str] = &["icu_hoendat", "hoendat"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IcuStay {
    pub person_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub care_site_id: Option<i64>,
}

/// ICU stays found in the source, deduplicated, and the number of rows
/// dropped for lack of an end date.
pub fn derive_icu_stays(source: &SourceTable) -> Result<(Vec<IcuStay>, usize)> {
    let mut cache = ColumnCache::new(source);
    let flags = codes(cache.column(ICU_FLAG)?);
    let starts = dates(cache.column(ICU_START)?);
    let persons = codes(cache.column(PERSON_ID_COLUMN)?);
    let care_sites = codes(cache.column(CARE_SITE_ID_COLUMN)?);
    let mut ends: Vec<Vec<Option<NaiveDate>>> = Vec::with_capacity(ICU_END.len());
    for column in ICU_END {
        ends.push(dates(cache.column(column)?));
    }

    let mut stays = BTreeSet::new();
    let mut missing_end = 0;
    for row in 0..source.height() {
        if flags[row] != Some(YesNo::Yes.code()) {
            continue;
        }
        let (Some(person_id), Some(start)) = (persons[row], starts[row]) else {
            continue;
        };
        let Some(end) = ends.iter().find_map(|column| column[row]) else {
            missing_end += 1;
            continue;
        };
        stays.insert(IcuStay {
            person_id,
            start,
            end,
            care_site_id: care_sites[row],
        });
    }
    Ok((stays.into_iter().collect(), missing_end))
}

fn codes(values: &[Option<String>]) -> Vec<Option<i64>> {
    values
        .iter()
        .map(|value| value.as_deref().and_then(parse_code))
        .collect()
}

fn dates(values: &[Option<String>]) -> Vec<Option<NaiveDate>> {
    values
        .iter()
        .map(|value| value.as_deref().and_then(parse_date))
        .collect()
}

pub struct IcuVisitPopulator;

impl Populator for IcuVisitPopulator {
    fn name(&self) -> &'static str {
        "icu"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut visits = TableReport::new(self.name(), CdmTable::VisitOccurrence);
        let mut procedures = TableReport::new(self.name(), CdmTable::ProcedureOccurrence);

        let (stays, missing_end) = derive_icu_stays(source)?;
        if missing_end > 0 {
            warn!(rows = missing_end, "ICU stays dropped without an end date");
        }
        visits.candidates = stays.len() + missing_end;
        visits.dropped_no_date = missing_end;
        procedures.candidates = stays.len();

        let mut visit_batch = TableBatch::new(CdmTable::VisitOccurrence);
        for stay in &stays {
            let mut row = CdmRow::new(CdmTable::VisitOccurrence);
            row.set("person_id", stay.person_id)?
                .set("visit_concept_id", registry.visit.intensive_care)?
                .set("visit_start_date", stay.start)?
                .set("visit_end_date", stay.end)?
                .set("visit_type_concept_id", registry.type_concept)?
                .set_opt("care_site_id", stay.care_site_id)?
                .set("visit_source_value", ICU_FLAG)?;
            visit_batch.push(row)?;
        }
        visits.written = visit_batch.len();
        let block = write_batch(store, visit_batch)?;
        visits.first_id = (!block.is_empty()).then_some(block.start);

        let mut procedure_batch = TableBatch::new(CdmTable::ProcedureOccurrence);
        for (stay, visit_id) in stays.iter().zip(block.ids()) {
            let mut row = CdmRow::new(CdmTable::ProcedureOccurrence);
            row.set("person_id", stay.person_id)?
                .set("procedure_concept_id", registry.visit.icu_admission_procedure)?
                .set("procedure_date", stay.start)?
                .set("procedure_end_date", stay.end)?
                .set("procedure_type_concept_id", registry.type_concept)?
                .set("visit_occurrence_id", visit_id)?
                .set("procedure_source_value", ICU_FLAG)?;
            procedure_batch.push(row)?;
        }
        procedures.written = procedure_batch.len();
        let block = write_batch(store, procedure_batch)?;
        procedures.first_id = (!block.is_empty()).then_some(block.start);

        log_written(&visits);
        log_written(&procedures);
        Ok(vec![visits, procedures])
    }
}
