//! Yes/no intervention columns → procedure_occurrence.

use anyhow::Result;
use omop_ingest::SourceTable;
use omop_model::{CdmRow, CdmTable, TableReport};
use omop_store::CdmStore;

use super::Populator;
use super::common::{chain_columns, gather, keep_available, log_written, with_dates};
use crate::context::PopulateContext;
use crate::pattern::{FamilyGrammar, Role};
use crate::reshape::FactCandidate;
use crate::resolve::resolve_concepts;
use crate::rules::{DateChain, Truncations, report_unexpected};
use crate::writer::{TableBatch, write_batch};

pub struct ProcedurePopulator {
    grammar: FamilyGrammar,
}

impl ProcedurePopulator {
    pub fn new() -> Result<Self> {
        let grammar = FamilyGrammar::new(
            "procedure",
            &[r"^(?P<core>[a-z0-9_]+_(?:pr(?:trt|occur)|cmoccur))$"],
        )?
        .with_role(Role::Occur, "")
        .with_value_roles(&[Role::Occur])
        .with_flag_roles(&[Role::Occur]);
        Ok(Self { grammar })
    }
}

/// `*_cmoccur` questions are asked at admission.
fn date_chain(candidate: &FactCandidate) -> DateChain {
    if candidate.core.ends_with("_cmoccur") {
        DateChain::ADMISSION_PROCEDURE
    } else {
        DateChain::PROCEDURE
    }
}

impl Populator for ProcedurePopulator {
    fn name(&self) -> &'static str {
        "procedure"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut report = TableReport::new(self.name(), CdmTable::ProcedureOccurrence);
        let general = chain_columns(&[DateChain::ADMISSION_PROCEDURE, DateChain::PROCEDURE]);
        let (families, candidates) = gather(source, &self.grammar, &general)?;
        report.candidates = candidates.len();
        report.unmapped_variables =
            report_unexpected(self.name(), &families, |variable| registry.procedure.contains(variable));

        let available = keep_available(candidates, &self.grammar, &mut report);
        let dated = with_dates(self.name(), available, date_chain, &mut report);
        let resolved = resolve_concepts(
            self.name(),
            dated,
            |(candidate, _)| candidate.variable.as_str(),
            |(candidate, _)| registry.procedure.get(&candidate.variable),
        );
        report.dropped_no_concept += resolved.dropped;

        let mut truncations = Truncations::default();
        let mut batch = TableBatch::new(CdmTable::ProcedureOccurrence);
        for ((candidate, date), concept) in resolved.facts {
            let mut row = CdmRow::new(CdmTable::ProcedureOccurrence);
            row.set_opt("person_id", candidate.person_id)?
                .set("procedure_concept_id", concept)?
                .set("procedure_date", date)?
                .set("procedure_type_concept_id", registry.type_concept)?
                .set("procedure_source_value", truncations.apply(&candidate.variable))?;
            batch.push(row)?;
        }
        truncations.report(self.name());
        report.truncated = truncations.count();

        report.written = batch.len();
        let block = write_batch(store, batch)?;
        report.first_id = (!block.is_empty()).then_some(block.start);
        log_written(&report);
        Ok(vec![report])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::join::{Availability, Composite};

    fn candidate(core: &str, general: &[(&str, &str)]) -> FactCandidate {
        FactCandidate {
            row: 0,
            person_id: Some(1),
            variable: core.to_string(),
            core: core.to_string(),
            repeat: None,
            composite: Composite {
                value: Some("1".to_string()),
                value_role: Some(Role::Occur),
                availability: Availability::NotApplicable,
                unit: None,
                start: None,
                end: None,
                route: None,
                kind: None,
                treatment: None,
            },
            general: general
                .iter()
                .map(|(name, value)| ((*name).to_string(), Some((*value).to_string())))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn admission_questions_prefer_the_admission_date() {
        let dates = [("hostdat", "2020-03-02"), ("dsstdat", "2020-03-05")];
        let oxygen = candidate("oxygen_cmoccur", &dates);
        assert_eq!(
            date_chain(&oxygen).resolve(&oxygen),
            NaiveDate::from_ymd_opt(2020, 3, 2)
        );
        let prone = candidate("pronevent_prtrt", &dates);
        assert_eq!(
            date_chain(&prone).resolve(&prone),
            NaiveDate::from_ymd_opt(2020, 3, 5)
        );
    }
}
