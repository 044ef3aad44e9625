//! Treatment families (`<core>_cm...`).
//!
//! One candidate can feed two tables: the treatment itself as a procedure
//! (looked up by variable, then core) and, when a specific drug can be
//! identified, a drug exposure. Drugs are identified from the coded type
//! (or checkbox option) first, then from the first word of the free-text
//! name.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use omop_ingest::{SourceTable, is_free_text, parse_code};
use omop_model::{CdmRow, CdmTable, ConceptId, TableReport};
use omop_store::CdmStore;
use omop_vocab::ConceptRegistry;
use tracing::{debug, warn};

use super::Populator;
use super::common::{gather, keep_available, log_written, with_dates};
use crate::context::PopulateContext;
use crate::pattern::{FamilyGrammar, Repeat, Role};
use crate::reshape::FactCandidate;
use crate::rules::{DateChain, Truncations, report_unexpected};
use crate::writer::{TableBatch, write_batch};

pub struct DrugPopulator {
    grammar: FamilyGrammar,
}

impl DrugPopulator {
    pub fn new() -> Result<Self> {
        let grammar = FamilyGrammar::new(
            "drug",
            &[r"^(?P<core>[a-z0-9_]*_cm)(?P<role>yn|trt|dat|route|end|type)(?P<repeat>_(?:__)?[1-9][0-9]?)?$"],
        )?
        .with_role(Role::Yn, "yn")
        .with_role(Role::Trt, "trt")
        .with_role(Role::Dat, "dat")
        .with_role(Role::Route, "route")
        .with_role(Role::End, "end")
        .with_role(Role::Type, "type")
        .with_value_roles(&[Role::Trt, Role::Type, Role::Yn])
        .with_flag_roles(&[Role::Trt, Role::Yn]);
        Ok(Self { grammar })
    }

    pub fn grammar(&self) -> &FamilyGrammar {
        &self.grammar
    }
}

pub fn treatment_concept(registry: &ConceptRegistry, candidate: &FactCandidate) -> Option<ConceptId> {
    registry
        .treatment_procedure
        .get(&candidate.variable)
        .or_else(|| registry.treatment_procedure.get(&candidate.core))
}

pub fn drug_concept(registry: &ConceptRegistry, candidate: &FactCandidate) -> Option<ConceptId> {
    let code = match candidate.repeat {
        Some(Repeat::Checkbox(option)) => Some(i64::from(option)),
        _ => candidate.composite.kind.as_deref().and_then(parse_code),
    };
    code.and_then(|code| registry.drug.coded(&candidate.core, code))
        .or_else(|| {
            candidate
                .composite
                .treatment
                .as_deref()
                .and_then(|text| registry.drug.lexicon_match(text))
        })
}

fn free_text(candidate: &FactCandidate) -> Option<&str> {
    candidate
        .composite
        .treatment
        .as_deref()
        .filter(|text| is_free_text(text))
        .map(str::trim)
}

impl Populator for DrugPopulator {
    fn name(&self) -> &'static str {
        "drug"
    }

    fn populate(
        &self,
        source: &SourceTable,
        store: &mut dyn CdmStore,
        ctx: &PopulateContext<'_>,
    ) -> Result<Vec<TableReport>> {
        let registry = ctx.registry;
        let mut treatments = TableReport::new("treatment", CdmTable::ProcedureOccurrence);
        let mut report = TableReport::new(self.name(), CdmTable::DrugExposure);

        let (families, candidates) =
            gather(source, &self.grammar, &DateChain::TREATMENT.columns())?;
        report.candidates = candidates.len();
        treatments.candidates = candidates.len();
        report.unmapped_variables = report_unexpected(self.name(), &families, |variable| {
            families.get(variable).is_some_and(|family| {
                registry.treatment_procedure.contains(variable)
                    || registry.treatment_procedure.contains(&family.core)
                    || registry.drug.has_coded(&family.core)
            })
        });

        let available = keep_available(candidates, &self.grammar, &mut report);
        let dated = with_dates(self.name(), available, |_| DateChain::TREATMENT, &mut report);
        treatments.dropped_unavailable = report.dropped_unavailable;
        treatments.dropped_no_date = report.dropped_no_date;

        let mut truncations = Truncations::default();
        let mut procedure_batch = TableBatch::new(CdmTable::ProcedureOccurrence);
        let mut drug_batch = TableBatch::new(CdmTable::DrugExposure);
        let mut seen_procedures: BTreeSet<(i64, i64, NaiveDate, String)> = BTreeSet::new();
        let mut seen_drugs: BTreeSet<(i64, i64, NaiveDate)> = BTreeSet::new();
        let mut leftover: BTreeSet<String> = BTreeSet::new();
        let mut leftover_rows = 0;

        for (candidate, date) in dated {
            let Some(person_id) = candidate.person_id else {
                continue;
            };
            let procedure = treatment_concept(registry, &candidate);
            let drug = drug_concept(registry, &candidate);
            treatments.dropped_no_concept += usize::from(procedure.is_none());
            report.dropped_no_concept += usize::from(drug.is_none());
            if procedure.is_none() && drug.is_none() {
                leftover.insert(candidate.variable.clone());
                leftover_rows += 1;
                continue;
            }

            if let Some(concept) = procedure {
                let source_value =
                    truncations.apply(free_text(&candidate).unwrap_or(&candidate.core));
                if seen_procedures.insert((person_id, concept.get(), date, source_value.clone())) {
                    let mut row = CdmRow::new(CdmTable::ProcedureOccurrence);
                    row.set("person_id", person_id)?
                        .set("procedure_concept_id", concept)?
                        .set("procedure_date", date)?
                        .set_opt("procedure_end_date", candidate.composite.end)?
                        .set("procedure_type_concept_id", registry.type_concept)?
                        .set("procedure_source_value", source_value)?;
                    procedure_batch.push(row)?;
                }
            }

            if let Some(concept) = drug
                && seen_drugs.insert((person_id, concept.get(), date))
            {
                let source_value =
                    truncations.apply(free_text(&candidate).unwrap_or(&candidate.variable));
                debug!(
                    variable = %candidate.variable,
                    drug = ctx.redact(&source_value),
                    concept = %concept,
                    "drug identified"
                );
                let route = candidate
                    .composite
                    .route
                    .as_deref()
                    .map(|route| truncations.apply(route.trim()));
                let mut row = CdmRow::new(CdmTable::DrugExposure);
                row.set("person_id", person_id)?
                    .set("drug_concept_id", concept)?
                    .set("drug_exposure_start_date", date)?
                    .set(
                        "drug_exposure_end_date",
                        candidate.composite.end.unwrap_or(date),
                    )?
                    .set("drug_type_concept_id", registry.type_concept)?
                    .set("drug_source_value", source_value)?
                    .set_opt("route_source_value", route)?;
                drug_batch.push(row)?;
            }
        }

        if leftover_rows > 0 {
            warn!(
                stage = self.name(),
                rows = leftover_rows,
                variables = %leftover.iter().cloned().collect::<Vec<_>>().join(", "),
                "treatments matched neither a procedure nor a drug"
            );
        }
        truncations.report(self.name());
        report.truncated = truncations.count();

        treatments.written = procedure_batch.len();
        let block = write_batch(store, procedure_batch)?;
        treatments.first_id = (!block.is_empty()).then_some(block.start);
        log_written(&treatments);

        report.written = drug_batch.len();
        let block = write_batch(store, drug_batch)?;
        report.first_id = (!block.is_empty()).then_some(block.start);
        log_written(&report);

        Ok(vec![treatments, report])
    }
}
