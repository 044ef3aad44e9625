//! Vital signs and laboratory results → measurement.

use anyhow::Result;
use omop_ingest::SourceTable;
use omop_model::{CdmRow, CdmTable, TableReport};
use omop_store::CdmStore;
use tracing::debug;

use super::Populator;
use super::common::{chain_columns, gather, keep_available, log_written, with_dates};
use crate::context::PopulateContext;
use crate::pattern::{FamilyGrammar, Role};
use crate::reshape::FactCandidate;
use crate::resolve::resolve_concepts;
use crate::rules::{
    DateChain, LAB_PERFORMED, PT_INR, Truncations, normalize_measurement, report_unexpected,
};
use crate::writer::{TableBatch, write_batch};

pub struct MeasurementPopulator {
    grammar: FamilyGrammar,
}

impl MeasurementPopulator {
    pub fn new() -> Result<Self> {
        let grammar = FamilyGrammar::new(
            "measurement",
            &[r"^(?P<core>[a-z0-9_]*_(?:vs|lb))(?P<role>yn|orresu|orres)$"],
        )?
        .with_role(Role::Yn, "yn")
        .with_role(Role::Orres, "orres")
        .with_role(Role::Orresu, "orresu")
        .with_value_roles(&[Role::Orres])
        .with_flag_roles(&[Role::Yn])
        // Dehydration is a condition.
        .excluding("dehydration_vs");
        Ok(Self { grammar })
    }

    pub fn grammar(&self) -> &FamilyGrammar {
        &self.grammar
    }
}

fn date_chain(candidate: &FactCandidate) -> DateChain {
    if candidate.core.ends_with(LAB_PERFORMED.core_suffix) {
        DateChain::LAB
    } else {
        DateChain::VITAL_SIGN
    }
}

impl Populator for MeasurementPopulator {
    fn name(&self) -> &'static str {
        "measurement"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut report = TableReport::new(self.name(), CdmTable::Measurement);

        let mut source = source.clone();
        let cleared = PT_INR.apply(&mut source)?;
        if cleared > 0 {
            debug!(cells = cleared, "cleared unselected PT/INR results");
        }

        let mut general = chain_columns(&[DateChain::LAB, DateChain::VITAL_SIGN]);
        general.push(LAB_PERFORMED.flag);
        let (families, candidates) = gather(&source, &self.grammar, &general)?;
        report.candidates = candidates.len();
        report.unmapped_variables = report_unexpected(self.name(), &families, |variable| {
            registry.measurement(variable).is_some()
        });

        let available = keep_available(candidates, &self.grammar, &mut report);
        let before = available.len();
        let performed: Vec<FactCandidate> = available
            .into_iter()
            .filter(|candidate| !LAB_PERFORMED.excludes(candidate))
            .collect();
        report.dropped_unavailable += before - performed.len();

        let dated = with_dates(self.name(), performed, date_chain, &mut report);
        let resolved = resolve_concepts(
            self.name(),
            dated,
            |(candidate, _)| candidate.variable.as_str(),
            |(candidate, _)| registry.measurement(&candidate.variable).map(|config| config.concept),
        );
        report.dropped_no_concept += resolved.dropped;

        let mut truncations = Truncations::default();
        let mut batch = TableBatch::new(CdmTable::Measurement);
        for ((candidate, date), concept) in resolved.facts {
            let (Some(config), Some(value)) =
                (registry.measurement(&candidate.variable), candidate.value())
            else {
                continue;
            };
            let normalized =
                normalize_measurement(value, candidate.composite.unit.as_deref(), config, registry);
            let mut row = CdmRow::new(CdmTable::Measurement);
            row.set_opt("person_id", candidate.person_id)?
                .set("measurement_concept_id", concept)?
                .set("measurement_date", date)?
                .set("measurement_type_concept_id", registry.type_concept)?
                .set_opt("value_as_number", normalized.value_as_number)?
                .set_opt("unit_concept_id", normalized.unit_concept_id)?
                .set_opt("range_low", normalized.range_low)?
                .set_opt("range_high", normalized.range_high)?
                .set("measurement_source_value", truncations.apply(&candidate.variable))?
                .set_opt("unit_source_value", normalized.unit_source_value)?
                .set(
                    "value_source_value",
                    truncations.apply(&normalized.value_source_value),
                )?;
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
