use omop_ingest::SourceTable;
use omop_vocab::ConceptRegistry;

pub fn source(columns: &[(&str, &[Option<&str>])]) -> SourceTable {
    SourceTable::from_columns(
        columns
            .iter()
            .map(|(name, values)| {
                (
                    (*name).to_string(),
                    values.iter().map(|v| v.map(str::to_string)).collect(),
                )
            })
            .collect(),
    )
    .unwrap()
}

pub fn registry() -> ConceptRegistry {
    ConceptRegistry::load_default().unwrap()
}
