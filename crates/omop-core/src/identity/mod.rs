//! Person, location and care-site resolution.
//!
//! These run before the populators: they write the dimension rows, then
//! attach `person_id` and `care_site_id` columns to the source so every
//! fact can reference them. Rows of subjects that did not become a person
//! are removed.

pub mod care_site;
pub mod location;
pub mod person;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use omop_ingest::{SourceTable, parse_code};
use omop_model::{CdmTable, TableReport};
use omop_store::{CdmStore, Predicate};
use tracing::info;

use crate::context::PopulateContext;
use crate::reshape::PERSON_ID_COLUMN;

pub use care_site::resolve_care_sites;
pub use location::resolve_locations;
pub use person::resolve_persons;

/// Column added to the source with each row's care site id.
pub const CARE_SITE_ID_COLUMN: &str = "care_site_id";

/// Source subject identifier.
pub const SUBJECT_COLUMN: &str = "subjid";

/// Source value → id of the rows already stored in `table`.
pub(crate) fn existing_ids(
    store: &dyn CdmStore,
    table: CdmTable,
    source_column: &str,
) -> Result<BTreeMap<String, i64>> {
    let id_column = table.primary_key();
    let frame = store
        .select(table, &[id_column, source_column], &Predicate::new())
        .with_context(|| format!("read existing {table} rows"))?;
    let ids = frame.column(id_column)?.str()?;
    let keys = frame.column(source_column)?.str()?;
    let mut existing = BTreeMap::new();
    for (id, key) in ids.into_iter().zip(keys) {
        if let (Some(id), Some(key)) = (id.and_then(parse_code), key) {
            existing.entry(key.to_string()).or_insert(id);
        }
    }
    Ok(existing)
}

/// Outcome of identity resolution.
#[derive(Debug)]
pub struct Identities {
    /// Source rows of known persons, with id columns attached.
    pub source: SourceTable,
    pub persons: BTreeMap<String, i64>,
    pub reports: Vec<TableReport>,
}

/// Resolves locations, care sites and persons and returns the source rows
/// that belong to a person.
pub fn resolve_identities(
    source: &SourceTable,
    store: &mut dyn CdmStore,
    ctx: &PopulateContext<'_>,
) -> Result<Identities> {
    let (locations, location_report) = resolve_locations(source, store, ctx)?;
    let (care_sites, care_site_report) = resolve_care_sites(source, store, &locations)?;
    let (persons, person_report) = resolve_persons(source, store, ctx, &locations, &care_sites)?;

    let subjects = source.column_values(SUBJECT_COLUMN)?;
    let sites = source.column_values(care_site::SITE_COLUMN)?;
    let keep: Vec<bool> = subjects
        .iter()
        .map(|subject| subject.as_deref().is_some_and(|s| persons.contains_key(s)))
        .collect();
    let person_ids: Vec<Option<String>> = subjects
        .iter()
        .map(|subject| {
            subject
                .as_deref()
                .and_then(|s| persons.get(s))
                .map(i64::to_string)
        })
        .collect();
    let care_site_ids: Vec<Option<String>> = sites
        .iter()
        .map(|site| {
            site.as_deref()
                .map(str::trim)
                .and_then(|s| care_sites.get(s))
                .map(i64::to_string)
        })
        .collect();

    let mut attached = source.clone();
    attached.set_column(PERSON_ID_COLUMN, person_ids)?;
    attached.set_column(CARE_SITE_ID_COLUMN, care_site_ids)?;
    attached.filter_rows(&keep)?;
    let dropped = source.height() - attached.height();
    info!(
        persons = persons.len(),
        rows = attached.height(),
        dropped,
        "identities resolved"
    );

    Ok(Identities {
        source: attached,
        persons,
        reports: vec![location_report, care_site_report, person_report],
    })
}
