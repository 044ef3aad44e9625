//! Complications recorded as observations.

use anyhow::Result;
use omop_ingest::{SourceTable, is_free_text};
use omop_model::{CdmRow, CdmTable, TableReport};
use omop_store::CdmStore;

use super::Populator;
use super::common::{gather, keep_available_coded, log_written, with_dates};
use super::condition::{concept_for, source_value};
use crate::context::PopulateContext;
use crate::pattern::{FamilyGrammar, Role};
use crate::resolve::resolve_concepts;
use crate::rules::{DateChain, Truncations, report_unexpected};
use crate::writer::{TableBatch, write_batch};

pub struct ObservationPopulator {
    grammar: FamilyGrammar,
}

impl ObservationPopulator {
    pub fn new() -> Result<Self> {
        let grammar = FamilyGrammar::new(
            "observation",
            &[r"^(?P<core>[a-z0-9_]+_(?:ce|ae)term)(?P<role>_yn)?$"],
        )?
        .with_role(Role::Occur, "")
        .with_role(Role::Yn, "_yn")
        .with_value_roles(&[Role::Occur, Role::Yn])
        .with_flag_roles(&[Role::Occur, Role::Yn]);
        Ok(Self { grammar })
    }
}

impl Populator for ObservationPopulator {
    fn name(&self) -> &'static str {
        "observation"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut report = TableReport::new(self.name(), CdmTable::Observation);
        let (families, candidates) =
            gather(source, &self.grammar, &DateChain::OBSERVATION.columns())?;
        report.candidates = candidates.len();
        // Complications without an observation concept are conditions only.
        report.unmapped_variables = report_unexpected(self.name(), &families, |variable| {
            registry.observation.contains(variable)
                || registry.condition.contains(variable)
                || registry.coded.contains(variable)
        });

        let available =
            keep_available_coded(candidates, &self.grammar, &registry.coded, &mut report);
        let available = available
            .into_iter()
            .filter(|candidate| {
                registry.observation.contains(&candidate.variable)
                    || registry.coded.contains(&candidate.variable)
            })
            .collect();
        let dated = with_dates(self.name(), available, |_| DateChain::OBSERVATION, &mut report);
        let resolved = resolve_concepts(
            self.name(),
            dated,
            |(candidate, _)| candidate.variable.as_str(),
            |(candidate, _)| concept_for(&registry.observation, &registry.coded, candidate),
        );
        report.dropped_no_concept += resolved.dropped;

        let mut truncations = Truncations::default();
        let mut batch = TableBatch::new(CdmTable::Observation);
        for ((candidate, date), concept) in resolved.facts {
            let source_text = source_value(&candidate, &registry.coded, &mut truncations);
            let free_text = candidate
                .value()
                .is_some_and(is_free_text)
                .then(|| source_text.clone());
            let mut row = CdmRow::new(CdmTable::Observation);
            row.set_opt("person_id", candidate.person_id)?
                .set("observation_concept_id", concept)?
                .set("observation_date", date)?
                .set("observation_type_concept_id", registry.type_concept)?
                .set_opt("value_as_string", free_text)?
                .set("observation_source_value", source_text)?;
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
