//! Comorbidities, signs and symptoms, and complications → condition_occurrence.

use anyhow::Result;
use omop_ingest::{SourceTable, is_free_text, parse_code};
use omop_model::{CdmRow, CdmTable, ConceptId, TableReport};
use omop_store::CdmStore;
use omop_vocab::{CodedConcepts, ConceptMap};

use super::Populator;
use super::common::{gather, keep_available_coded, log_written, with_dates};
use crate::context::PopulateContext;
use crate::pattern::{FamilyGrammar, Role};
use crate::reshape::FactCandidate;
use crate::resolve::resolve_concepts;
use crate::rules::{DateChain, Truncations, report_unexpected};
use crate::writer::{TableBatch, write_batch};

pub struct ConditionPopulator {
    grammar: FamilyGrammar,
}

impl ConditionPopulator {
    pub fn new() -> Result<Self> {
        let grammar = FamilyGrammar::new(
            "condition",
            &[
                r"^(?P<core>[a-z0-9_]+_(?:mh(?:yn|yr)|ce(?:occur|coccur|term|termy)|aeterm)(?:_v[0-9]+)?)(?P<role>_yn)?$",
                r"^(?P<core>dehydration_vsorres)(?P<role>_yn)?$",
            ],
        )?
        .with_role(Role::Occur, "")
        .with_role(Role::Yn, "_yn")
        .with_value_roles(&[Role::Occur, Role::Yn])
        .with_flag_roles(&[Role::Occur, Role::Yn]);
        Ok(Self { grammar })
    }

    pub fn grammar(&self) -> &FamilyGrammar {
        &self.grammar
    }
}

/// Free text wins over the variable name as the source value. Coded answers
/// keep their code.
pub(crate) fn source_value(
    candidate: &FactCandidate,
    coded: &CodedConcepts,
    truncations: &mut Truncations,
) -> String {
    match candidate.value() {
        Some(value) if is_free_text(value) => truncations.apply(value.trim()),
        Some(value) if coded.contains(&candidate.variable) => match parse_code(value) {
            Some(code) => truncations.apply(&format!("{}={code}", candidate.variable)),
            None => truncations.apply(&candidate.variable),
        },
        _ => truncations.apply(&candidate.variable),
    }
}

/// Coded answers resolve on their code, everything else on the variable.
pub(crate) fn concept_for(
    map: &ConceptMap,
    coded: &CodedConcepts,
    candidate: &FactCandidate,
) -> Option<ConceptId> {
    if coded.contains(&candidate.variable) {
        let code = candidate.value().and_then(parse_code)?;
        coded.get(&candidate.variable, code)
    } else {
        map.get(&candidate.variable)
    }
}

impl Populator for ConditionPopulator {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut report = TableReport::new(self.name(), CdmTable::ConditionOccurrence);
        let (families, candidates) = gather(source, &self.grammar, &DateChain::CONDITION.columns())?;
        report.candidates = candidates.len();
        report.unmapped_variables = report_unexpected(self.name(), &families, |variable| {
            registry.condition.contains(variable) || registry.coded.contains(variable)
        });

        let available =
            keep_available_coded(candidates, &self.grammar, &registry.coded, &mut report);
        let dated = with_dates(self.name(), available, |_| DateChain::CONDITION, &mut report);
        let resolved = resolve_concepts(
            self.name(),
            dated,
            |(candidate, _)| candidate.variable.as_str(),
            |(candidate, _)| concept_for(&registry.condition, &registry.coded, candidate),
        );
        report.dropped_no_concept += resolved.dropped;

        let mut truncations = Truncations::default();
        let mut batch = TableBatch::new(CdmTable::ConditionOccurrence);
        for ((candidate, date), concept) in resolved.facts {
            let mut row = CdmRow::new(CdmTable::ConditionOccurrence);
            row.set_opt("person_id", candidate.person_id)?
                .set("condition_concept_id", concept)?
                .set("condition_start_date", date)?
                .set("condition_type_concept_id", registry.type_concept)?
                .set(
                    "condition_source_value",
                    source_value(&candidate, &registry.coded, &mut truncations),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::discover_families;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn grammar_covers_history_symptoms_and_complications() {
        let populator = ConditionPopulator::new().unwrap();
        let set = discover_families(
            &headers(&[
                "chroniccard_mhyn",
                "cough_ceoccur_v2",
                "cough_ceoccur_v2_yn",
                "seizures_cecoccur_v2",
                "ards_ceterm",
                "hyperglycemia_aeterm",
                "dehydration_vsorres",
                "temp_vsorres",
                "subjid",
            ]),
            populator.grammar(),
        );
        let variables: Vec<&str> = set.variables().collect();
        assert_eq!(
            variables,
            vec![
                "ards_ceterm",
                "chroniccard_mhyn",
                "cough_ceoccur_v2",
                "dehydration_vsorres",
                "hyperglycemia_aeterm",
                "seizures_cecoccur_v2"
            ]
        );
        let cough = set.get("cough_ceoccur_v2").unwrap();
        assert_eq!(cough.column(Role::Yn), Some("cough_ceoccur_v2_yn"));
        assert_eq!(cough.column(Role::Occur), Some("cough_ceoccur_v2"));
    }
}
