//! Countries → location.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use omop_ingest::{SourceTable, parse_code};
use omop_model::{CdmRow, CdmTable, ConceptId, TableReport};
use omop_store::{CdmStore, Predicate};
use tracing::{debug, warn};

use super::existing_ids;
use crate::context::PopulateContext;
use crate::writer::{TableBatch, write_batch};

pub const COUNTRY_COLUMN: &str = "country";

/// Normalized country code of a cell (`"186.0"` → `"186"`).
pub fn country_code(cell: &str) -> Option<String> {
    parse_code(cell).map(|code| code.to_string())
}

/// Standard Geography concept named `name`, if the vocabulary is loaded.
fn country_concept(store: &dyn CdmStore, name: &str) -> Result<Option<ConceptId>> {
    let predicate = Predicate::new()
        .eq("concept_name", name)
        .eq("domain_id", "Geography")
        .eq("standard_concept", "S")
        .eq("concept_class_id", "Location");
    let frame = store.select(CdmTable::Concept, &["concept_id"], &predicate)?;
    let ids = frame.column("concept_id")?.str()?;
    Ok(ids
        .into_iter()
        .flatten()
        .find_map(parse_code)
        .map(ConceptId::new))
}

/// Writes a location per new country code and returns code → location id
/// for every code seen in the source or already stored.
pub fn resolve_locations(
    source: &SourceTable,
    store: &mut dyn CdmStore,
    ctx: &PopulateContext<'_>,
) -> Result<(BTreeMap<String, i64>, TableReport)> {
    let mut report = TableReport::new("location", CdmTable::Location);
    let codes: BTreeSet<String> = source
        .column_values(COUNTRY_COLUMN)?
        .iter()
        .flatten()
        .filter_map(|cell| country_code(cell))
        .collect();
    report.candidates = codes.len();

    let mut locations = existing_ids(store, CdmTable::Location, "location_source_value")?;
    let new_codes: Vec<&String> = codes
        .iter()
        .filter(|code| !locations.contains_key(*code))
        .collect();

    let mut batch = TableBatch::new(CdmTable::Location);
    let mut unknown_countries = 0;
    for code in &new_codes {
        let name = ctx.registry.country_name(code);
        let concept = match name {
            Some(name) => country_concept(store, name)?,
            None => {
                unknown_countries += 1;
                None
            }
        };
        let mut row = CdmRow::new(CdmTable::Location);
        row.set("location_source_value", code.as_str())?
            .set_opt("country_source_value", name)?
            .set_opt("country_concept_id", concept)?;
        batch.push(row)?;
    }
    if unknown_countries > 0 {
        warn!(count = unknown_countries, "country codes without a name");
    }

    report.written = batch.len();
    let block = write_batch(store, batch)?;
    report.first_id = (!block.is_empty()).then_some(block.start);
    for (code, id) in new_codes.into_iter().zip(block.ids()) {
        locations.insert(code.clone(), id);
    }
    debug!(
        new = report.written,
        known = locations.len(),
        "locations resolved"
    );
    Ok((locations, report))
}

#[cfg(test)]
mod tests {
    use omop_store::DuckDbStore;

    use super::*;
    use crate::test_support::{registry, source};

    #[test]
    fn codes_are_normalized() {
        assert_eq!(country_code("186.0"), Some("186".to_string()));
        assert_eq!(country_code("UK"), None);
    }

    #[test]
    fn existing_locations_are_reused() {
        let registry = registry();
        let ctx = PopulateContext::new(&registry);
        let mut store = DuckDbStore::open_in_memory().unwrap();
        let table = source(&[("country", &[Some("186"), Some("186.0"), Some("126"), None])]);

        let (first, report) = resolve_locations(&table, &mut store, &ctx).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(first.len(), 2);

        let (second, report) = resolve_locations(&table, &mut store, &ctx).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(first, second);
        assert_eq!(store.row_count(CdmTable::Location).unwrap(), 2);
    }
}
