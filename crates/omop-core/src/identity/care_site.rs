//! Site names → care_site.

use std::collections::BTreeMap;

use anyhow::Result;
use omop_ingest::SourceTable;
use omop_model::{CdmRow, CdmTable, TableReport};
use omop_store::CdmStore;

use super::existing_ids;
use super::location::{COUNTRY_COLUMN, country_code};
use crate::writer::{TableBatch, write_batch};

pub const SITE_COLUMN: &str = "sitename";

/// Writes a care site per new site name, located in the country of the
/// site's first row. Returns site name → care site id.
pub fn resolve_care_sites(
    source: &SourceTable,
    store: &mut dyn CdmStore,
    locations: &BTreeMap<String, i64>,
) -> Result<(BTreeMap<String, i64>, TableReport)> {
    let mut report = TableReport::new("care_site", CdmTable::CareSite);
    let sites = source.column_values(SITE_COLUMN)?;
    let countries = source.column_values(COUNTRY_COLUMN)?;

    let mut seen: BTreeMap<String, Option<i64>> = BTreeMap::new();
    for (site, country) in sites.iter().zip(&countries) {
        let Some(site) = site.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let location = country
            .as_deref()
            .and_then(country_code)
            .and_then(|code| locations.get(&code).copied());
        let entry = seen.entry(site.to_string()).or_insert(location);
        if entry.is_none() {
            *entry = location;
        }
    }
    report.candidates = seen.len();

    let mut care_sites = existing_ids(store, CdmTable::CareSite, "care_site_source_value")?;
    let new_sites: Vec<(String, Option<i64>)> = seen
        .into_iter()
        .filter(|(site, _)| !care_sites.contains_key(site))
        .collect();

    let mut batch = TableBatch::new(CdmTable::CareSite);
    for (site, location) in &new_sites {
        let mut row = CdmRow::new(CdmTable::CareSite);
        row.set("care_site_name", site.as_str())?
            .set_opt("location_id", *location)?
            .set("care_site_source_value", site.as_str())?;
        batch.push(row)?;
    }
    report.written = batch.len();
    let block = write_batch(store, batch)?;
    report.first_id = (!block.is_empty()).then_some(block.start);
    for ((site, _), id) in new_sites.into_iter().zip(block.ids()) {
        care_sites.insert(site, id);
    }
    Ok((care_sites, report))
}

#[cfg(test)]
mod tests {
    use omop_store::DuckDbStore;

    use super::*;
    use crate::test_support::source;

    #[test]
    fn sites_take_the_first_known_country() {
        let mut store = DuckDbStore::open_in_memory().unwrap();
        let table = source(&[
            ("sitename", &[Some("Leiden "), Some("Leiden"), Some("Utrecht"), None]),
            ("country", &[None, Some("126"), None, Some("186")]),
        ]);
        let locations = BTreeMap::from([("126".to_string(), 7)]);
        let (sites, report) = resolve_care_sites(&table, &mut store, &locations).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(sites.len(), 2);

        let frame = store
            .select(
                CdmTable::CareSite,
                &["location_id"],
                &omop_store::Predicate::new().eq("care_site_source_value", "Leiden"),
            )
            .unwrap();
        let ids = frame.column("location_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("7"));
    }
}
