//! Wide-to-long mapping of ISARIC case report forms onto OMOP CDM tables.
//!
//! A source row holds many clinical variables side by side, each spread
//! over sibling columns (`<core>yn`, `<core>orres`, `<core>orresu`, ...).
//! The engine finds those families ([`pattern`]), joins their siblings
//! ([`join`]), melts them into fact candidates ([`reshape`]), filters and
//! normalizes them ([`rules`]), resolves concepts ([`resolve`]) and writes
//! them with fresh surrogate keys ([`keys`], [`writer`]).

pub mod context;
pub mod identity;
pub mod join;
pub mod keys;
pub mod pattern;
pub mod pipeline;
pub mod populators;
pub mod reshape;
pub mod resolve;
pub mod rules;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use context::{PopulateContext, PopulateOptions};
pub use identity::{Identities, resolve_identities};
pub use pattern::{FamilyGrammar, FamilySet, Repeat, Role, VariableFamily, discover_families};
pub use pipeline::{run_pipeline, run_with};
pub use populators::{Populator, default_populators};
pub use reshape::{FactCandidate, reshape};
pub use writer::{TableBatch, write_batch};
