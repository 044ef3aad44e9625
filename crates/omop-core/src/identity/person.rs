//! Subjects → person.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use omop_ingest::{SourceTable, parse_code, parse_date, parse_f64};
use omop_model::{CdmRow, CdmTable, ConceptId, TableReport};
use omop_store::CdmStore;
use omop_vocab::PersonConcepts;
use tracing::{debug, warn};

use super::care_site::SITE_COLUMN;
use super::location::{COUNTRY_COLUMN, country_code};
use super::{SUBJECT_COLUMN, existing_ids};
use crate::context::PopulateContext;
use crate::join::ColumnCache;
use crate::rules::{Truncations, truncate_source_value};
use crate::writer::{TableBatch, write_batch};

/// `ethnic` code whose label is replaced by the `other_ethnic` free text.
const ETHNIC_OTHER: i64 = 9;
const ETHNIC_NOT_AVAILABLE: &str = "N/A";

/// Demographics of one subject, taken from their first row.
#[derive(Debug, Clone, PartialEq)]
pub struct Demographics {
    pub subject: String,
    pub sex: Option<i64>,
    pub age: Option<f64>,
    pub age_unit: Option<i64>,
    pub ethnic: Option<i64>,
    pub other_ethnic: Option<String>,
    pub enrolled: Option<NaiveDate>,
    pub country: Option<String>,
    pub site: Option<String>,
}

impl Demographics {
    /// Age in years; `None` without an age.
    pub fn age_years(&self, concepts: &PersonConcepts) -> Option<f64> {
        let age = self.age?;
        if self.age_unit == Some(concepts.age_months_code) {
            Some(age / 12.0)
        } else {
            Some(age)
        }
    }

    pub fn year_of_birth(&self, concepts: &PersonConcepts) -> Option<i64> {
        let age = self.age_years(concepts)?;
        let enrolled = self.enrolled?;
        Some((f64::from(enrolled.year()) - age).round() as i64)
    }

    /// Ethnicity label, the free text for "other", or "N/A".
    pub fn ethnicity_source_value(&self, concepts: &PersonConcepts) -> String {
        let label = self
            .ethnic
            .and_then(|code| concepts.ethnic(code))
            .map(|entry| entry.label.clone());
        match (self.ethnic, label) {
            (Some(ETHNIC_OTHER), Some(label)) => self
                .other_ethnic
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(label),
            (_, Some(label)) => label,
            (_, None) => ETHNIC_NOT_AVAILABLE.to_string(),
        }
    }

    pub fn ethnicity_concept(&self, concepts: &PersonConcepts) -> ConceptId {
        self.ethnic
            .and_then(|code| concepts.ethnic(code))
            .and_then(|entry| entry.ethnicity)
            .unwrap_or(concepts.ethnicity_not_stated)
    }
}

/// First row per subject, in order of first appearance.
pub fn first_rows(source: &SourceTable) -> Result<Vec<Demographics>> {
    let mut cache = ColumnCache::new(source);
    let mut seen = BTreeSet::new();
    let mut subjects = Vec::new();
    for row in 0..source.height() {
        let Some(subject) = cache.cell(SUBJECT_COLUMN, row)? else {
            continue;
        };
        let subject = subject.trim().to_string();
        if subject.is_empty() || !seen.insert(subject.clone()) {
            continue;
        }
        let code = |cell: Option<String>| cell.as_deref().and_then(parse_code);
        subjects.push(Demographics {
            subject,
            sex: code(cache.cell("sex", row)?),
            age: cache
                .cell("age_estimateyears", row)?
                .as_deref()
                .and_then(parse_f64),
            age_unit: code(cache.cell("age_estimateyearsu", row)?),
            ethnic: code(cache.cell("ethnic", row)?),
            other_ethnic: cache.cell("other_ethnic", row)?,
            enrolled: cache.cell("dsstdat", row)?.as_deref().and_then(parse_date),
            country: cache
                .cell(COUNTRY_COLUMN, row)?
                .as_deref()
                .and_then(country_code),
            site: cache
                .cell(SITE_COLUMN, row)?
                .map(|site| site.trim().to_string()),
        });
    }
    Ok(subjects)
}

/// Writes a person per new subject with an age and enrolment date and
/// returns subject → person id for every subject that has one.
pub fn resolve_persons(
    source: &SourceTable,
    store: &mut dyn CdmStore,
    ctx: &PopulateContext<'_>,
    locations: &BTreeMap<String, i64>,
    care_sites: &BTreeMap<String, i64>,
) -> Result<(BTreeMap<String, i64>, TableReport)> {
    let concepts = &ctx.registry.person;
    let mut report = TableReport::new("person", CdmTable::Person);
    let subjects = first_rows(source)?;
    report.candidates = subjects.len();

    let existing = existing_ids(store, CdmTable::Person, "person_source_value")?;
    let mut persons = BTreeMap::new();
    let mut new_subjects = Vec::new();
    let mut truncations = Truncations::default();
    let mut batch = TableBatch::new(CdmTable::Person);
    for subject in &subjects {
        // Stored ids are truncated, so compare truncated.
        let (source_value, _) = truncate_source_value(&subject.subject);
        if let Some(id) = existing.get(&source_value) {
            persons.insert(subject.subject.clone(), *id);
            continue;
        }
        if subject.age.is_none() {
            report.dropped_unavailable += 1;
            continue;
        }
        let Some(year_of_birth) = subject.year_of_birth(concepts) else {
            report.dropped_no_date += 1;
            continue;
        };

        let sex = subject.sex.and_then(|code| concepts.sex(code));
        let ethnicity = subject.ethnicity_source_value(concepts);
        debug!(
            subject = ctx.redact(&subject.subject),
            year_of_birth,
            "new person"
        );
        let mut row = CdmRow::new(CdmTable::Person);
        row.set(
            "gender_concept_id",
            sex.map_or(concepts.gender_unknown, |entry| entry.concept),
        )?
        .set("year_of_birth", year_of_birth)?
        .set("race_concept_id", concepts.race_for_label(&ethnicity))?
        .set("ethnicity_concept_id", subject.ethnicity_concept(concepts))?
        .set_opt(
            "location_id",
            subject.country.as_ref().and_then(|code| locations.get(code).copied()),
        )?
        .set_opt(
            "care_site_id",
            subject.site.as_ref().and_then(|site| care_sites.get(site).copied()),
        )?
        .set("person_source_value", truncations.apply(&subject.subject))?
        .set_opt("gender_source_value", sex.map(|entry| entry.label.as_str()))?
        .set("ethnicity_source_value", truncations.apply(&ethnicity))?;
        batch.push(row)?;
        new_subjects.push(subject.subject.clone());
    }
    if report.dropped_no_date > 0 {
        warn!(
            rows = report.dropped_no_date,
            "subjects skipped without an enrolment date"
        );
    }
    if report.dropped_unavailable > 0 {
        debug!(rows = report.dropped_unavailable, "subjects skipped without an age");
    }
    truncations.report("person");
    report.truncated = truncations.count();

    report.written = batch.len();
    let block = write_batch(store, batch)?;
    report.first_id = (!block.is_empty()).then_some(block.start);
    persons.extend(new_subjects.into_iter().zip(block.ids()));
    Ok((persons, report))
}
