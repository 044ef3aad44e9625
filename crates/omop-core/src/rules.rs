//! Row filters and value rules applied between reshape and concept lookup.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use omop_ingest::{SourceTable, format_numeric, is_free_text, parse_code, parse_date, parse_f64};
use omop_model::{ConceptId, YesNo};
use omop_vocab::{ConceptRegistry, MeasurementConcept, units};
use tracing::warn;

use crate::join::Availability;
use crate::pattern::{FamilyGrammar, FamilySet, Repeat};
use crate::reshape::FactCandidate;

/// Longest text written to a `*_source_value` column.
pub const SOURCE_VALUE_LIMIT: usize = 50;

/// Availability gate.
///
/// Free text in a value column always passes. Otherwise the family's `yn`
/// sibling must say "yes"; without one, a flag-valued or checkbox family
/// must carry "yes" itself and any other value passes.
pub fn is_available(candidate: &FactCandidate, grammar: &FamilyGrammar) -> bool {
    let Some(value) = candidate.value() else {
        return false;
    };
    if is_free_text(value) {
        return true;
    }
    match candidate.composite.availability {
        Availability::Reported(answer) => answer.is_some_and(YesNo::is_yes),
        Availability::NotApplicable => {
            let flag_valued = candidate
                .composite
                .value_role
                .is_some_and(|role| grammar.is_flag(role));
            let checkbox = matches!(candidate.repeat, Some(Repeat::Checkbox(_)));
            if flag_valued || checkbox {
                parse_code(value) == Some(YesNo::Yes.code())
            } else {
                true
            }
        }
    }
}

/// Availability gate for coded answers. A `yn` sibling must still say
/// "yes"; without one any integer code passes and the code is resolved
/// later.
pub fn is_coded_available(candidate: &FactCandidate) -> bool {
    let Some(value) = candidate.value() else {
        return false;
    };
    match candidate.composite.availability {
        Availability::Reported(answer) => answer.is_some_and(YesNo::is_yes),
        Availability::NotApplicable => parse_code(value).is_some(),
    }
}

/// Mutually exclusive families selected by a discriminator column.
#[derive(Debug, Clone, Copy)]
pub struct ExclusivityRule {
    pub discriminator: &'static str,
    pub choices: &'static [(i64, &'static str)],
}

/// PT and INR share one result slot; the answer to `daily_pt_inr_lbyn`
/// says which one was measured.
pub const PT_INR: ExclusivityRule = ExclusivityRule {
    discriminator: "daily_pt_inr_lbyn",
    choices: &[(1, "daily_pt_lb"), (2, "daily_inr_lb")],
};

impl ExclusivityRule {
    /// Nulls the columns of every choice the discriminator did not select.
    /// Rows whose discriminator is empty or outside the choices are left
    /// alone. Returns the number of cells cleared.
    pub fn apply(&self, source: &mut SourceTable) -> Result<usize> {
        if !source.has_column(self.discriminator) {
            return Ok(0);
        }
        let selected = source.code_values(self.discriminator)?;
        let headers = source.headers();
        let mut cleared = 0;
        for (code, core) in self.choices {
            let mask: Vec<bool> = selected
                .iter()
                .map(|value| {
                    value.is_some_and(|value| {
                        value != *code && self.choices.iter().any(|(other, _)| *other == value)
                    })
                })
                .collect();
            let rows = mask.iter().filter(|null| **null).count();
            if rows == 0 {
                continue;
            }
            for column in headers.iter().filter(|name| name.starts_with(core)) {
                source.null_where(column, &mask)?;
                cleared += rows;
            }
        }
        Ok(cleared)
    }
}

/// Families whose core ends in `core_suffix` need `flag` = yes on the row.
#[derive(Debug, Clone, Copy)]
pub struct PerformGate {
    pub flag: &'static str,
    pub core_suffix: &'static str,
}

pub const LAB_PERFORMED: PerformGate = PerformGate {
    flag: "daily_lbperf",
    core_suffix: "_lb",
};

impl PerformGate {
    pub fn excludes(&self, candidate: &FactCandidate) -> bool {
        candidate.core.ends_with(self.core_suffix)
            && candidate.general(self.flag).and_then(parse_code) != Some(YesNo::Yes.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// The family's own `dat` sibling.
    Start,
    /// The family's own `end` sibling.
    End,
    /// A row-level column.
    Column(&'static str),
}

/// Ordered fallback list for a fact's event date.
#[derive(Debug, Clone, Copy)]
pub struct DateChain(pub &'static [DateSource]);

impl DateChain {
    pub const CONDITION: Self = Self(&[DateSource::Column("cestdat"), DateSource::Column("dsstdat")]);
    pub const OBSERVATION: Self = Self(&[
        DateSource::Column("cestdat"),
        DateSource::Column("daily_dsstdat"),
    ]);
    pub const LAB: Self = Self(&[
        DateSource::Column("daily_lbdat"),
        DateSource::Column("daily_dsstdat"),
        DateSource::Column("hostdat"),
        DateSource::Column("dsstdat"),
    ]);
    pub const VITAL_SIGN: Self = Self(&[
        DateSource::Column("daily_dsstdat"),
        DateSource::Column("hostdat"),
        DateSource::Column("dsstdat"),
    ]);
    pub const ADMISSION_PROCEDURE: Self =
        Self(&[DateSource::Column("hostdat"), DateSource::Column("dsstdat")]);
    pub const PROCEDURE: Self = Self(&[DateSource::Column("dsstdat"), DateSource::Column("hostdat")]);
    pub const TREATMENT: Self = Self(&[
        DateSource::Start,
        DateSource::Column("daily_dsstdat"),
        DateSource::Column("dsstdat"),
    ]);

    pub fn resolve(&self, candidate: &FactCandidate) -> Option<NaiveDate> {
        self.0.iter().find_map(|source| match source {
            DateSource::Start => candidate.composite.start,
            DateSource::End => candidate.composite.end,
            DateSource::Column(name) => candidate.general(name).and_then(parse_date),
        })
    }

    /// Row-level columns the chain reads; reshape must carry them.
    pub fn columns(&self) -> Vec<&'static str> {
        self.0
            .iter()
            .filter_map(|source| match source {
                DateSource::Column(name) => Some(*name),
                _ => None,
            })
            .collect()
    }
}

/// Cuts `text` to [`SOURCE_VALUE_LIMIT`] characters. The flag says whether
/// anything was removed.
pub fn truncate_source_value(text: &str) -> (String, bool) {
    match text.char_indices().nth(SOURCE_VALUE_LIMIT) {
        Some((cut, _)) => (text[..cut].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Counts truncations for one populator and reports them once.
#[derive(Debug, Default)]
pub struct Truncations {
    count: usize,
}

impl Truncations {
    pub fn apply(&mut self, text: &str) -> String {
        let (value, truncated) = truncate_source_value(text);
        if truncated {
            self.count += 1;
        }
        value
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn report(&self, stage: &str) {
        if self.count > 0 {
            warn!(
                stage,
                count = self.count,
                limit = SOURCE_VALUE_LIMIT,
                "source values truncated"
            );
        }
    }
}

/// A measurement value after parsing and unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMeasurement {
    pub value_as_number: Option<f64>,
    pub value_source_value: String,
    pub unit_concept_id: Option<ConceptId>,
    pub unit_source_value: Option<String>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
}

/// Parses the value and settles its unit.
///
/// A coded unit is mapped through the variable's unit code set and the
/// value converted to the canonical unit when they differ. Without a unit
/// code the value is taken to be in the canonical unit already. Text that
/// is not a number keeps a null `value_as_number`.
pub fn normalize_measurement(
    value: &str,
    unit: Option<&str>,
    config: &MeasurementConcept,
    registry: &ConceptRegistry,
) -> NormalizedMeasurement {
    let mut number = parse_f64(value);
    let mut unit_name = config.unit.clone();
    let mut unit_source_value = config.unit.clone();

    if let Some(set) = &config.unit_codes {
        let recorded = unit
            .and_then(parse_code)
            .and_then(|code| registry.unit_for_code(set, code));
        unit_source_value = recorded.map(str::to_string);
        unit_name = match (&config.canonical_unit, recorded) {
            (Some(canonical), Some(from)) => {
                if from != canonical.as_str() {
                    number = number.and_then(|n| units::convert(n, from, canonical));
                }
                Some(canonical.clone())
            }
            (Some(canonical), None) => Some(canonical.clone()),
            (None, recorded) => recorded.map(str::to_string),
        };
    }

    NormalizedMeasurement {
        value_as_number: number,
        value_source_value: number.map_or_else(|| value.to_string(), format_numeric),
        unit_concept_id: unit_name
            .as_deref()
            .and_then(|name| registry.unit_concept(name)),
        unit_source_value,
        range_low: config.range_low,
        range_high: config.range_high,
    }
}

/// Discovered variables the populator has no concept for, reported in one
/// warning.
pub fn report_unexpected(
    stage: &str,
    families: &FamilySet,
    known: impl Fn(&str) -> bool,
) -> Vec<String> {
    let unexpected: BTreeSet<&str> = families
        .variables()
        .filter(|variable| !known(variable))
        .collect();
    let unexpected: Vec<String> = unexpected.into_iter().map(str::to_string).collect();
    if !unexpected.is_empty() {
        warn!(
            stage,
            count = unexpected.len(),
            variables = %unexpected.join(", "),
            "variables without a concept mapping"
        );
    }
    unexpected
}
