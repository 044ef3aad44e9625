//! OMOP CDM target tables and their fixed, ordered headers.
//!
//! Output batches are reindexed to exactly these headers; columns a
//! populator does not fill stay null.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage class of a CDM column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Date,
    DateTime,
}

impl ColumnKind {
    /// SQL type used when creating the table.
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Int => "BIGINT",
            Self::Float => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Date => "DATE",
            Self::DateTime => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn int(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Int,
    }
}

const fn float(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Float,
    }
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Text,
    }
}

const fn date(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Date,
    }
}

const fn datetime(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::DateTime,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdmTable {
    Person,
    Location,
    CareSite,
    VisitOccurrence,
    ConditionOccurrence,
    Observation,
    Measurement,
    ProcedureOccurrence,
    DrugExposure,
    /// Vocabulary table; read only.
    Concept,
}

impl CdmTable {
    /// Tables the pipeline writes, in foreign-key order.
    pub const WRITE_ORDER: [CdmTable; 9] = [
        CdmTable::Location,
        CdmTable::CareSite,
        CdmTable::Person,
        CdmTable::VisitOccurrence,
        CdmTable::ConditionOccurrence,
        CdmTable::Observation,
        CdmTable::Measurement,
        CdmTable::ProcedureOccurrence,
        CdmTable::DrugExposure,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Location => "location",
            Self::CareSite => "care_site",
            Self::VisitOccurrence => "visit_occurrence",
            Self::ConditionOccurrence => "condition_occurrence",
            Self::Observation => "observation",
            Self::Measurement => "measurement",
            Self::ProcedureOccurrence => "procedure_occurrence",
            Self::DrugExposure => "drug_exposure",
            Self::Concept => "concept",
        }
    }

    /// Surrogate key column; allocated by the pipeline, never by the database.
    pub const fn primary_key(self) -> &'static str {
        match self {
            Self::Person => "person_id",
            Self::Location => "location_id",
            Self::CareSite => "care_site_id",
            Self::VisitOccurrence => "visit_occurrence_id",
            Self::ConditionOccurrence => "condition_occurrence_id",
            Self::Observation => "observation_id",
            Self::Measurement => "measurement_id",
            Self::ProcedureOccurrence => "procedure_occurrence_id",
            Self::DrugExposure => "drug_exposure_id",
            Self::Concept => "concept_id",
        }
    }

    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            Self::Person => PERSON,
            Self::Location => LOCATION,
            Self::CareSite => CARE_SITE,
            Self::VisitOccurrence => VISIT_OCCURRENCE,
            Self::ConditionOccurrence => CONDITION_OCCURRENCE,
            Self::Observation => OBSERVATION,
            Self::Measurement => MEASUREMENT,
            Self::ProcedureOccurrence => PROCEDURE_OCCURRENCE,
            Self::DrugExposure => DRUG_EXPOSURE,
            Self::Concept => CONCEPT,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|column| column.name == name)
    }

    pub fn column_names(self) -> Vec<&'static str> {
        self.columns().iter().map(|column| column.name).collect()
    }
}

impl fmt::Display for CdmTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const PERSON: &[ColumnDef] = &[
    int("person_id"),
    int("gender_concept_id"),
    int("year_of_birth"),
    int("month_of_birth"),
    int("day_of_birth"),
    datetime("birth_datetime"),
    int("race_concept_id"),
    int("ethnicity_concept_id"),
    int("location_id"),
    int("provider_id"),
    int("care_site_id"),
    text("person_source_value"),
    text("gender_source_value"),
    int("gender_source_concept_id"),
    text("race_source_value"),
    int("race_source_concept_id"),
    text("ethnicity_source_value"),
    int("ethnicity_source_concept_id"),
];

const LOCATION: &[ColumnDef] = &[
    int("location_id"),
    text("address_1"),
    text("address_2"),
    text("city"),
    text("state"),
    text("zip"),
    text("county"),
    text("location_source_value"),
    int("country_concept_id"),
    text("country_source_value"),
    float("latitude"),
    float("longitude"),
];

const CARE_SITE: &[ColumnDef] = &[
    int("care_site_id"),
    text("care_site_name"),
    int("place_of_service_concept_id"),
    int("location_id"),
    text("care_site_source_value"),
    text("place_of_service_source_value"),
];

const VISIT_OCCURRENCE: &[ColumnDef] = &[
    int("visit_occurrence_id"),
    int("person_id"),
    int("visit_concept_id"),
    date("visit_start_date"),
    datetime("visit_start_datetime"),
    date("visit_end_date"),
    datetime("visit_end_datetime"),
    int("visit_type_concept_id"),
    int("provider_id"),
    int("care_site_id"),
    text("visit_source_value"),
    int("visit_source_concept_id"),
    int("admitted_from_concept_id"),
    text("admitted_from_source_value"),
    int("discharged_to_concept_id"),
    text("discharged_to_source_value"),
    int("preceding_visit_occurrence_id"),
];

const CONDITION_OCCURRENCE: &[ColumnDef] = &[
    int("condition_occurrence_id"),
    int("person_id"),
    int("condition_concept_id"),
    date("condition_start_date"),
    datetime("condition_start_datetime"),
    date("condition_end_date"),
    datetime("condition_end_datetime"),
    int("condition_type_concept_id"),
    int("condition_status_concept_id"),
    text("stop_reason"),
    int("provider_id"),
    int("visit_occurrence_id"),
    int("visit_detail_id"),
    text("condition_source_value"),
    int("condition_source_concept_id"),
    text("condition_status_source_value"),
];

const OBSERVATION: &[ColumnDef] = &[
    int("observation_id"),
    int("person_id"),
    int("observation_concept_id"),
    date("observation_date"),
    datetime("observation_datetime"),
    int("observation_type_concept_id"),
    float("value_as_number"),
    text("value_as_string"),
    int("value_as_concept_id"),
    int("qualifier_concept_id"),
    int("unit_concept_id"),
    int("provider_id"),
    int("visit_occurrence_id"),
    int("visit_detail_id"),
    text("observation_source_value"),
    int("observation_source_concept_id"),
    text("unit_source_value"),
    text("qualifier_source_value"),
    text("value_source_value"),
    int("observation_event_id"),
    int("obs_event_field_concept_id"),
];

const MEASUREMENT: &[ColumnDef] = &[
    int("measurement_id"),
    int("person_id"),
    int("measurement_concept_id"),
    date("measurement_date"),
    datetime("measurement_datetime"),
    text("measurement_time"),
    int("measurement_type_concept_id"),
    int("operator_concept_id"),
    float("value_as_number"),
    int("value_as_concept_id"),
    int("unit_concept_id"),
    float("range_low"),
    float("range_high"),
    int("provider_id"),
    int("visit_occurrence_id"),
    int("visit_detail_id"),
    text("measurement_source_value"),
    int("measurement_source_concept_id"),
    text("unit_source_value"),
    int("unit_source_concept_id"),
    text("value_source_value"),
    int("measurement_event_id"),
    int("meas_event_field_concept_id"),
];

const PROCEDURE_OCCURRENCE: &[ColumnDef] = &[
    int("procedure_occurrence_id"),
    int("person_id"),
    int("procedure_concept_id"),
    date("procedure_date"),
    datetime("procedure_datetime"),
    date("procedure_end_date"),
    datetime("procedure_end_datetime"),
    int("procedure_type_concept_id"),
    int("modifier_concept_id"),
    int("quantity"),
    int("provider_id"),
    int("visit_occurrence_id"),
    int("visit_detail_id"),
    text("procedure_source_value"),
    int("procedure_source_concept_id"),
    text("modifier_source_value"),
];

const DRUG_EXPOSURE: &[ColumnDef] = &[
    int("drug_exposure_id"),
    int("person_id"),
    int("drug_concept_id"),
    date("drug_exposure_start_date"),
    datetime("drug_exposure_start_datetime"),
    date("drug_exposure_end_date"),
    datetime("drug_exposure_end_datetime"),
    date("verbatim_end_date"),
    int("drug_type_concept_id"),
    text("stop_reason"),
    int("refills"),
    float("quantity"),
    int("days_supply"),
    text("sig"),
    int("route_concept_id"),
    text("lot_number"),
    int("provider_id"),
    int("visit_occurrence_id"),
    int("visit_detail_id"),
    text("drug_source_value"),
    int("drug_source_concept_id"),
    text("route_source_value"),
    text("dose_unit_source_value"),
];

const CONCEPT: &[ColumnDef] = &[
    int("concept_id"),
    text("concept_name"),
    text("domain_id"),
    text("vocabulary_id"),
    text("concept_class_id"),
    text("standard_concept"),
    text("concept_code"),
];
