//! Concept registry for the ISARIC → OMOP mapping.
//!
//! The tables live in `vocab/concepts.toml`, are compiled into the binary and
//! validated once when loaded. A different table can be substituted with
//! [`ConceptRegistry::load_path`] or [`ConceptRegistry::from_toml_str`].

pub mod error;
pub mod registry;
mod schema;
pub mod units;

pub use error::VocabError;
pub use registry::{
    CodedConcepts, ConceptMap, ConceptRegistry, DomainSummary, DrugConcepts, PersonConcepts,
};
pub use schema::{EthnicEntry, MeasurementConcept, SexEntry, VisitConcepts};
