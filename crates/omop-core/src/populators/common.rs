//! Stage helpers shared by the family-driven populators.

use anyhow::Result;
use chrono::NaiveDate;
use omop_ingest::SourceTable;
use omop_model::{CdmTable, TableReport};
use omop_vocab::CodedConcepts;
use tracing::{debug, info, warn};

use crate::pattern::{FamilyGrammar, FamilySet, discover_families};
use crate::reshape::{FactCandidate, reshape};
use crate::rules::{DateChain, is_available, is_coded_available};

/// Discovers the grammar's families and melts them, carrying `general`
/// row-level columns along.
pub fn gather(
    source: &SourceTable,
    grammar: &FamilyGrammar,
    general: &[&str],
) -> Result<(FamilySet, Vec<FactCandidate>)> {
    let families = discover_families(&source.headers(), grammar);
    let candidates = reshape(source, &families, grammar, general)?;
    debug!(
        stage = grammar.name(),
        families = families.len(),
        candidates = candidates.len(),
        "reshaped"
    );
    Ok((families, candidates))
}

/// Availability gate plus a person check. Counts what it drops.
pub fn keep_available(
    candidates: Vec<FactCandidate>,
    grammar: &FamilyGrammar,
    report: &mut TableReport,
) -> Vec<FactCandidate> {
    let before = candidates.len();
    let kept: Vec<FactCandidate> = candidates
        .into_iter()
        .filter(|candidate| candidate.person_id.is_some() && is_available(candidate, grammar))
        .collect();
    report.dropped_unavailable += before - kept.len();
    kept
}

/// [`keep_available`] for stages that also read coded answers: variables
/// listed in `coded` take the coded gate.
pub fn keep_available_coded(
    candidates: Vec<FactCandidate>,
    grammar: &FamilyGrammar,
    coded: &CodedConcepts,
    report: &mut TableReport,
) -> Vec<FactCandidate> {
    let before = candidates.len();
    let kept: Vec<FactCandidate> = candidates
        .into_iter()
        .filter(|candidate| {
            candidate.person_id.is_some()
                && if coded.contains(&candidate.variable) {
                    is_coded_available(candidate)
                } else {
                    is_available(candidate, grammar)
                }
        })
        .collect();
    report.dropped_unavailable += before - kept.len();
    kept
}

/// Resolves each fact's date and drops those without one, with one warning.
pub fn with_dates(
    stage: &str,
    candidates: Vec<FactCandidate>,
    chain: impl Fn(&FactCandidate) -> DateChain,
    report: &mut TableReport,
) -> Vec<(FactCandidate, NaiveDate)> {
    let mut dated = Vec::with_capacity(candidates.len());
    let mut missing = 0;
    for candidate in candidates {
        match chain(&candidate).resolve(&candidate) {
            Some(date) => dated.push((candidate, date)),
            None => missing += 1,
        }
    }
    if missing > 0 {
        warn!(stage, rows = missing, "rows dropped without a usable date");
    }
    report.dropped_no_date += missing;
    dated
}

/// Union of the row-level columns several chains read.
pub fn chain_columns(chains: &[DateChain]) -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = Vec::new();
    for chain in chains {
        for column in chain.columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }
    columns
}

pub fn log_written(report: &TableReport) {
    info!(
        stage = %report.stage,
        table = report.table.map_or("-", CdmTable::name),
        written = report.written,
        dropped = report.dropped(),
        "populated"
    );
}
