use omop_core::{PopulateContext, run_pipeline};
use omop_ingest::SourceTable;
use omop_model::CdmTable;
use omop_store::{CdmStore, DuckDbStore, Predicate};
use omop_vocab::ConceptRegistry;

fn source() -> SourceTable {
    let column = |name: &str, values: &[Option<&str>]| {
        (
            name.to_string(),
            values.iter().map(|v| v.map(str::to_string)).collect::<Vec<_>>(),
        )
    };
    SourceTable::from_columns(vec![
        column("subjid", &[Some("A1"), Some("A1"), Some("B2")]),
        column("sitename", &[Some("Leiden"), Some("Leiden"), Some("Leiden")]),
        column("country", &[Some("126"), Some("126"), Some("126")]),
        column("sex", &[Some("2"), Some("2"), Some("1")]),
        column("age_estimateyears", &[Some("54"), Some("54"), None]),
        column("age_estimateyearsu", &[Some("2"), Some("2"), None]),
        column("ethnic", &[Some("6"), None, None]),
        column("dsstdat", &[Some("2020-03-01"), Some("2020-03-01"), Some("2020-03-02")]),
        column("daily_dsstdat", &[None, Some("2020-03-03"), None]),
        column("cough_ceoccur_v2_yn", &[Some("1"), None, Some("1")]),
        column("daily_temp_vsorres", &[None, Some("38.5"), Some("39.0")]),
        column("daily_temp_vsorresu", &[None, Some("1"), Some("1")]),
    ])
    .unwrap()
}

fn cell(store: &DuckDbStore, table: CdmTable, column: &str, predicate: &Predicate) -> Option<String> {
    let frame = store.select(table, &[column], predicate).unwrap();
    frame
        .column(column)
        .unwrap()
        .str()
        .unwrap()
        .get(0)
        .map(str::to_string)
}

#[test]
fn run_writes_person_dimensions_and_facts() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();

    let summary = run_pipeline("test.csv", &source(), &mut store, &ctx).unwrap();
    assert_eq!(summary.source_rows, 3);
    assert_eq!(summary.persons, 1);

    let person = Predicate::new().eq("person_source_value", "A1");
    assert_eq!(cell(&store, CdmTable::Person, "person_id", &person).as_deref(), Some("1"));
    assert_eq!(cell(&store, CdmTable::Person, "gender_concept_id", &person).as_deref(), Some("8532"));
    assert_eq!(cell(&store, CdmTable::Person, "year_of_birth", &person).as_deref(), Some("1966"));
    assert_eq!(
        cell(&store, CdmTable::Person, "ethnicity_concept_id", &person).as_deref(),
        Some("38003563")
    );
    assert_eq!(cell(&store, CdmTable::Person, "location_id", &person).as_deref(), Some("1"));
    assert_eq!(cell(&store, CdmTable::Person, "care_site_id", &person).as_deref(), Some("1"));
    assert_eq!(
        cell(&store, CdmTable::Location, "country_source_value", &Predicate::new()).as_deref(),
        Some("Netherlands")
    );

    // B2 has no age, so none of their rows are mapped.
    assert_eq!(store.row_count(CdmTable::ConditionOccurrence).unwrap(), 1);
    assert_eq!(store.row_count(CdmTable::Measurement).unwrap(), 1);
    assert_eq!(
        cell(&store, CdmTable::Measurement, "measurement_date", &Predicate::new()).as_deref(),
        Some("2020-03-03")
    );

    let condition = summary
        .tables
        .iter()
        .find(|report| report.table == Some(CdmTable::ConditionOccurrence))
        .unwrap();
    assert_eq!(condition.written, 1);
}

#[test]
fn second_run_reuses_dimensions_and_appends_facts() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();

    run_pipeline("test.csv", &source(), &mut store, &ctx).unwrap();
    let summary = run_pipeline("test.csv", &source(), &mut store, &ctx).unwrap();

    assert_eq!(summary.persons, 1);
    assert_eq!(store.row_count(CdmTable::Person).unwrap(), 1);
    assert_eq!(store.row_count(CdmTable::Location).unwrap(), 1);
    assert_eq!(store.row_count(CdmTable::CareSite).unwrap(), 1);
    assert_eq!(store.row_count(CdmTable::ConditionOccurrence).unwrap(), 2);
    assert_eq!(
        store
            .max_value(CdmTable::ConditionOccurrence, "condition_occurrence_id")
            .unwrap(),
        Some(2)
    );
}
