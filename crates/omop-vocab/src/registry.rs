use std::collections::BTreeMap;
use std::path::Path;

use omop_model::ConceptId;
use serde::Serialize;

use crate::error::VocabError;
use crate::schema::{
    EthnicEntry, MeasurementConcept, PersonFile, SexEntry, VisitConcepts, VocabFile,
};
use crate::units;

const SCHEMA: &str = "isaric-omop.concepts";
const SCHEMA_VERSION: u32 = 1;

const DEFAULT_TABLE: &str = include_str!("../vocab/concepts.toml");

/// Source key → concept id for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptMap {
    entries: BTreeMap<String, ConceptId>,
}

impl ConceptMap {
    pub fn get(&self, key: &str) -> Option<ConceptId> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, ConceptId)> for ConceptMap {
    fn from_iter<T: IntoIterator<Item = (K, ConceptId)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(key, id)| (key.into(), id)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonConcepts {
    pub gender_unknown: ConceptId,
    pub race_other: ConceptId,
    pub ethnicity_not_stated: ConceptId,
    pub age_months_code: i64,
    sex: BTreeMap<i64, SexEntry>,
    ethnic: BTreeMap<i64, EthnicEntry>,
}

impl PersonConcepts {
    pub fn sex(&self, code: i64) -> Option<&SexEntry> {
        self.sex.get(&code)
    }

    pub fn ethnic(&self, code: i64) -> Option<&EthnicEntry> {
        self.ethnic.get(&code)
    }

    /// Race concept for an ethnicity label, as written to
    /// `race_source_value`. Unknown labels (free text) map to "other race".
    pub fn race_for_label(&self, label: &str) -> ConceptId {
        self.ethnic
            .values()
            .find(|entry| entry.label == label)
            .map_or(self.race_other, |entry| entry.race)
    }
}

/// Variables whose answer is a code with its own concept, e.g. smoking
/// status or ARDS severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodedConcepts {
    entries: BTreeMap<String, BTreeMap<i64, ConceptId>>,
}

impl CodedConcepts {
    pub fn get(&self, variable: &str, code: i64) -> Option<ConceptId> {
        self.entries.get(variable)?.get(&code).copied()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.entries.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugConcepts {
    coded: BTreeMap<String, BTreeMap<i64, ConceptId>>,
    lexicon: BTreeMap<String, ConceptId>,
}

impl DrugConcepts {
    /// Concept for a coded treatment type, e.g. `antiviral_cm` type 1.
    pub fn coded(&self, core: &str, code: i64) -> Option<ConceptId> {
        self.coded.get(core)?.get(&code).copied()
    }

    /// True when `core` has a coded type table.
    pub fn has_coded(&self, core: &str) -> bool {
        self.coded.contains_key(core)
    }

    /// Matches the first word of a free-text drug name, ignoring case.
    pub fn lexicon_match(&self, text: &str) -> Option<ConceptId> {
        let token = first_token(text)?;
        self.lexicon.get(&token).copied()
    }

    pub fn lexicon_len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn coded_len(&self) -> usize {
        self.coded.values().map(BTreeMap::len).sum()
    }
}

fn first_token(text: &str) -> Option<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .find(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Name and entry count of one registry domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub name: &'static str,
    pub entries: usize,
}

/// Validated concept tables, loaded once per run and handed to every
/// populator.
#[derive(Debug, Clone)]
pub struct ConceptRegistry {
    pub type_concept: ConceptId,
    pub visit: VisitConcepts,
    pub person: PersonConcepts,
    pub condition: ConceptMap,
    pub observation: ConceptMap,
    pub coded: CodedConcepts,
    pub procedure: ConceptMap,
    pub treatment_procedure: ConceptMap,
    pub drug: DrugConcepts,
    measurement: BTreeMap<String, MeasurementConcept>,
    units: ConceptMap,
    unit_codes: BTreeMap<String, BTreeMap<i64, String>>,
    countries: BTreeMap<String, String>,
}

impl ConceptRegistry {
    /// The concept table compiled into the binary.
    pub fn load_default() -> Result<Self, VocabError> {
        Self::from_toml_str(DEFAULT_TABLE, "embedded concepts.toml")
    }

    pub fn load_path(path: &Path) -> Result<Self, VocabError> {
        let contents = std::fs::read_to_string(path).map_err(|e| VocabError::io(path, e))?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, VocabError> {
        let file: VocabFile = toml::from_str(contents).map_err(|source| VocabError::Toml {
            origin: origin.to_string(),
            source,
        })?;
        Self::validate(file)
    }

    fn validate(file: VocabFile) -> Result<Self, VocabError> {
        if file.meta.schema != SCHEMA || file.meta.schema_version != SCHEMA_VERSION {
            return Err(VocabError::UnsupportedSchema {
                schema: file.meta.schema,
                version: file.meta.schema_version,
            });
        }

        let condition = concept_map("condition", file.condition)?;
        let observation = concept_map("observation", file.observation)?;
        let procedure = concept_map("procedure", file.procedure)?;
        let treatment_procedure = concept_map("treatment_procedure", file.treatment_procedure)?;
        let units = concept_map("units", file.units)?;
        let person = person_concepts(file.person)?;

        let mut unit_codes = BTreeMap::new();
        for (set, codes) in file.unit_codes {
            let domain = format!("unit_codes.{set}");
            let mut parsed = BTreeMap::new();
            for (code, unit) in codes {
                if !units.contains(&unit) {
                    return Err(VocabError::UnknownUnit {
                        entry: domain.clone(),
                        unit,
                    });
                }
                parsed.insert(parse_code(&domain, &code)?, unit);
            }
            unit_codes.insert(set, parsed);
        }

        for (variable, config) in &file.measurement {
            let entry = format!("measurement.{variable}");
            check_concept("measurement", variable, config.concept)?;
            validate_measurement(&entry, config, &units, &unit_codes)?;
        }

        let coded = coded_table("coded", file.coded)?;
        let drug_coded = coded_table("drug.coded", file.drug.coded)?;
        let mut lexicon = BTreeMap::new();
        for (token, id) in file.drug.lexicon {
            check_concept("drug.lexicon", &token, id)?;
            lexicon.insert(token.to_lowercase(), id);
        }

        Ok(Self {
            type_concept: file.type_concepts.case_report_form,
            visit: file.visit,
            person,
            condition,
            observation,
            coded: CodedConcepts { entries: coded },
            procedure,
            treatment_procedure,
            drug: DrugConcepts {
                coded: drug_coded,
                lexicon,
            },
            measurement: file.measurement,
            units,
            unit_codes,
            countries: file.countries,
        })
    }

    pub fn measurement(&self, variable: &str) -> Option<&MeasurementConcept> {
        self.measurement.get(variable)
    }

    pub fn unit_concept(&self, unit: &str) -> Option<ConceptId> {
        self.units.get(unit)
    }

    /// Unit name for a coded `<core>orresu` value.
    pub fn unit_for_code(&self, set: &str, code: i64) -> Option<&str> {
        self.unit_codes.get(set)?.get(&code).map(String::as_str)
    }

    pub fn country_name(&self, code: &str) -> Option<&str> {
        self.countries.get(code).map(String::as_str)
    }

    pub fn domains(&self) -> Vec<DomainSummary> {
        vec![
            DomainSummary {
                name: "condition",
                entries: self.condition.len(),
            },
            DomainSummary {
                name: "observation",
                entries: self.observation.len(),
            },
            DomainSummary {
                name: "coded answers",
                entries: self.coded.len(),
            },
            DomainSummary {
                name: "measurement",
                entries: self.measurement.len(),
            },
            DomainSummary {
                name: "procedure",
                entries: self.procedure.len(),
            },
            DomainSummary {
                name: "treatment_procedure",
                entries: self.treatment_procedure.len(),
            },
            DomainSummary {
                name: "drug (coded)",
                entries: self.drug.coded_len(),
            },
            DomainSummary {
                name: "drug (lexicon)",
                entries: self.drug.lexicon_len(),
            },
            DomainSummary {
                name: "units",
                entries: self.units.len(),
            },
            DomainSummary {
                name: "countries",
                entries: self.countries.len(),
            },
        ]
    }
}

fn check_concept(domain: &str, key: &str, id: ConceptId) -> Result<(), VocabError> {
    if id.get() < 0 {
        return Err(VocabError::NegativeConcept {
            domain: domain.to_string(),
            key: key.to_string(),
            id: id.get(),
        });
    }
    Ok(())
}

fn concept_map(
    domain: &str,
    entries: BTreeMap<String, ConceptId>,
) -> Result<ConceptMap, VocabError> {
    for (key, id) in &entries {
        check_concept(domain, key, *id)?;
    }
    Ok(ConceptMap { entries })
}

fn coded_table(
    prefix: &str,
    tables: BTreeMap<String, BTreeMap<String, ConceptId>>,
) -> Result<BTreeMap<String, BTreeMap<i64, ConceptId>>, VocabError> {
    let mut parsed = BTreeMap::new();
    for (variable, codes) in tables {
        let domain = format!("{prefix}.{variable}");
        let mut entries = BTreeMap::new();
        for (code, id) in codes {
            check_concept(&domain, &code, id)?;
            entries.insert(parse_code(&domain, &code)?, id);
        }
        parsed.insert(variable, entries);
    }
    Ok(parsed)
}

fn parse_code(domain: &str, code: &str) -> Result<i64, VocabError> {
    code.trim()
        .parse::<i64>()
        .map_err(|_| VocabError::InvalidCode {
            domain: domain.to_string(),
            code: code.to_string(),
        })
}

fn person_concepts(file: PersonFile) -> Result<PersonConcepts, VocabError> {
    check_concept("person", "gender_unknown", file.gender_unknown)?;
    check_concept("person", "race_other", file.race_other)?;
    check_concept("person", "ethnicity_not_stated", file.ethnicity_not_stated)?;

    let mut sex = BTreeMap::new();
    for (code, entry) in file.sex {
        check_concept("person.sex", &code, entry.concept)?;
        sex.insert(parse_code("person.sex", &code)?, entry);
    }
    let mut ethnic = BTreeMap::new();
    for (code, entry) in file.ethnic {
        check_concept("person.ethnic", &code, entry.race)?;
        if let Some(id) = entry.ethnicity {
            check_concept("person.ethnic", &code, id)?;
        }
        ethnic.insert(parse_code("person.ethnic", &code)?, entry);
    }
    Ok(PersonConcepts {
        gender_unknown: file.gender_unknown,
        race_other: file.race_other,
        ethnicity_not_stated: file.ethnicity_not_stated,
        age_months_code: file.age_months_code,
        sex,
        ethnic,
    })
}

fn validate_measurement(
    entry: &str,
    config: &MeasurementConcept,
    units: &ConceptMap,
    unit_codes: &BTreeMap<String, BTreeMap<i64, String>>,
) -> Result<(), VocabError> {
    for unit in [&config.unit, &config.canonical_unit].into_iter().flatten() {
        if !units.contains(unit) {
            return Err(VocabError::UnknownUnit {
                entry: entry.to_string(),
                unit: unit.clone(),
            });
        }
    }
    if let Some(set) = &config.unit_codes {
        let codes = unit_codes
            .get(set)
            .ok_or_else(|| VocabError::UnknownUnitCodes {
                entry: entry.to_string(),
                set: set.clone(),
            })?;
        if let Some(canonical) = &config.canonical_unit {
            for unit in codes.values() {
                if !units::is_supported(unit, canonical) {
                    return Err(VocabError::UnsupportedConversion {
                        entry: entry.to_string(),
                        from: unit.clone(),
                        to: canonical.clone(),
                    });
                }
            }
        }
    }
    if let (Some(low), Some(high)) = (config.range_low, config.range_high)
        && low > high
    {
        return Err(VocabError::InvalidRange {
            entry: entry.to_string(),
            low,
            high,
        });
    }
    Ok(())
}
