//! Raw, unvalidated layout of `concepts.toml`.

use std::collections::BTreeMap;

use omop_model::ConceptId;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VocabFile {
    pub meta: Meta,
    pub type_concepts: TypeConcepts,
    pub visit: VisitConcepts,
    pub person: PersonFile,
    #[serde(default)]
    pub condition: BTreeMap<String, ConceptId>,
    #[serde(default)]
    pub observation: BTreeMap<String, ConceptId>,
    #[serde(default)]
    pub units: BTreeMap<String, ConceptId>,
    #[serde(default)]
    pub unit_codes: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub measurement: BTreeMap<String, MeasurementConcept>,
    #[serde(default)]
    pub coded: BTreeMap<String, BTreeMap<String, ConceptId>>,
    #[serde(default)]
    pub procedure: BTreeMap<String, ConceptId>,
    #[serde(default)]
    pub treatment_procedure: BTreeMap<String, ConceptId>,
    #[serde(default)]
    pub drug: DrugFile,
    #[serde(default)]
    pub countries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Meta {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct TypeConcepts {
    pub case_report_form: ConceptId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VisitConcepts {
    pub inpatient: ConceptId,
    pub intensive_care: ConceptId,
    pub alternate_care_site: ConceptId,
    pub icu_admission_procedure: ConceptId,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PersonFile {
    pub gender_unknown: ConceptId,
    pub race_other: ConceptId,
    pub ethnicity_not_stated: ConceptId,
    pub age_months_code: i64,
    #[serde(default)]
    pub sex: BTreeMap<String, SexEntry>,
    #[serde(default)]
    pub ethnic: BTreeMap<String, EthnicEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SexEntry {
    pub label: String,
    pub concept: ConceptId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EthnicEntry {
    pub label: String,
    pub race: ConceptId,
    #[serde(default)]
    pub ethnicity: Option<ConceptId>,
}

/// Per-variable measurement settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeasurementConcept {
    pub concept: ConceptId,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_codes: Option<String>,
    #[serde(default)]
    pub canonical_unit: Option<String>,
    #[serde(default)]
    pub range_low: Option<f64>,
    #[serde(default)]
    pub range_high: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DrugFile {
    #[serde(default)]
    pub coded: BTreeMap<String, BTreeMap<String, ConceptId>>,
    #[serde(default)]
    pub lexicon: BTreeMap<String, ConceptId>,
}
