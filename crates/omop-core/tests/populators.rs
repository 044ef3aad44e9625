//! Populators against an in-memory store with the embedded concept table.

use omop_core::populators::{
    ConditionPopulator, DrugPopulator, IcuVisitPopulator, MeasurementPopulator, Populator,
};
use omop_core::PopulateContext;
use omop_ingest::SourceTable;
use omop_model::CdmTable;
use omop_store::{CdmStore, DuckDbStore, Predicate};
use omop_vocab::ConceptRegistry;

fn source(columns: &[(&str, &[Option<&str>])]) -> SourceTable {
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

/// Text cells of `columns` for every row of `table`, ordered by key.
fn rows(store: &DuckDbStore, table: CdmTable, columns: &[&str]) -> Vec<Vec<Option<String>>> {
    let mut with_key = vec![table.primary_key()];
    with_key.extend_from_slice(columns);
    let frame = store.select(table, &with_key, &Predicate::new()).unwrap();
    let mut rows: Vec<(i64, Vec<Option<String>>)> = (0..frame.height())
        .map(|idx| {
            let key = frame
                .column(table.primary_key())
                .unwrap()
                .str()
                .unwrap()
                .get(idx)
                .unwrap()
                .parse()
                .unwrap();
            let cells = columns
                .iter()
                .map(|column| {
                    frame
                        .column(column)
                        .unwrap()
                        .str()
                        .unwrap()
                        .get(idx)
                        .map(str::to_string)
                })
                .collect();
            (key, cells)
        })
        .collect();
    rows.sort_by_key(|(key, _)| *key);
    rows.into_iter().map(|(_, cells)| cells).collect()
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[test]
fn cough_becomes_one_condition_on_enrolment_day() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("subjid", &[Some("A1")]),
        ("person_id", &[Some("1")]),
        ("cough_ceoccur_v2_yn", &[Some("1")]),
        ("dsstdat", &[Some("2020-03-01")]),
    ]);

    let reports = ConditionPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    assert_eq!(reports[0].written, 1);
    assert_eq!(
        rows(
            &store,
            CdmTable::ConditionOccurrence,
            &["person_id", "condition_concept_id", "condition_start_date"]
        ),
        vec![vec![text("1"), text("4038519"), text("2020-03-01")]]
    );
}

#[test]
fn unmapped_sentinel_is_written_and_unknown_variable_is_dropped() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1")]),
        ("dsstdat", &[Some("2020-03-01")]),
        ("other_ceoccur", &[Some("Hiccups")]),
        ("mystery_ceoccur_v2_yn", &[Some("1")]),
    ]);

    let reports = ConditionPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    let report = &reports[0];
    assert_eq!(report.written, 1);
    assert_eq!(report.dropped_no_concept, 1);
    assert_eq!(report.unmapped_variables, vec!["mystery_ceoccur_v2".to_string()]);
    assert_eq!(
        rows(
            &store,
            CdmTable::ConditionOccurrence,
            &["condition_concept_id", "condition_source_value"]
        ),
        vec![vec![text("0"), text("Hiccups")]]
    );
}

#[test]
fn coded_answers_resolve_on_their_code() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("dsstdat", &[Some("2020-03-01"), Some("2020-03-02")]),
        ("smoking_mhyn", &[Some("3"), Some("99")]),
        ("ardssev_ceterm", &[Some("2"), None]),
    ]);

    let reports = ConditionPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    let report = &reports[0];
    assert_eq!(report.written, 2);
    assert_eq!(report.dropped_unavailable, 0);
    assert_eq!(report.dropped_no_concept, 1);
    assert!(report.unmapped_variables.is_empty());
    assert_eq!(
        rows(
            &store,
            CdmTable::ConditionOccurrence,
            &["condition_concept_id", "condition_source_value"]
        ),
        vec![
            vec![text("4195694"), text("ardssev_ceterm=2")],
            vec![text("4310250"), text("smoking_mhyn=3")],
        ]
    );
}

#[test]
fn not_available_answer_suppresses_the_measurement() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("dsstdat", &[Some("2020-03-01"), Some("2020-03-01")]),
        ("temp_vsyn", &[Some("3"), Some("1")]),
        ("temp_vsorres", &[Some("38.2"), Some("100.4")]),
        ("temp_vsorresu", &[Some("1"), Some("2")]),
    ]);

    let reports = MeasurementPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    assert_eq!(reports[0].written, 1);
    assert_eq!(reports[0].dropped_unavailable, 1);
    let written = rows(
        &store,
        CdmTable::Measurement,
        &["person_id", "value_as_number", "unit_concept_id", "unit_source_value"],
    );
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][0], text("2"));
    let celsius: f64 = written[0][1].as_deref().unwrap().parse().unwrap();
    assert!((celsius - 38.0).abs() < 1e-6);
    assert_eq!(
        written[0][2],
        registry.unit_concept("celsius").map(|id| id.to_string())
    );
    assert_eq!(written[0][3], text("fahrenheit"));
}

#[test]
fn inr_answer_leaves_no_pt_result() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1")]),
        ("daily_dsstdat", &[Some("2020-03-03")]),
        ("daily_lbperf", &[Some("1")]),
        ("daily_pt_inr_lbyn", &[Some("2")]),
        ("daily_pt_lborres", &[Some("13.5")]),
        ("daily_inr_lborres", &[Some("1.1")]),
    ]);

    MeasurementPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    let pt = registry.measurement("daily_pt_lb").unwrap().concept;
    let inr = registry.measurement("daily_inr_lb").unwrap().concept;
    let written = rows(
        &store,
        CdmTable::Measurement,
        &["measurement_concept_id", "measurement_date"],
    );
    assert_eq!(written, vec![vec![Some(inr.to_string()), text("2020-03-03")]]);
    assert!(!written.iter().any(|row| row[0] == Some(pt.to_string())));
}

#[test]
fn labs_without_perform_flag_are_skipped() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1")]),
        ("daily_dsstdat", &[Some("2020-03-03")]),
        ("daily_crp_lborres", &[Some("45")]),
    ]);

    let reports = MeasurementPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    assert_eq!(reports[0].written, 0);
    assert_eq!(reports[0].dropped_unavailable, 1);
}

#[test]
fn long_other_treatment_is_truncated_to_fifty_characters() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let long = "Experimental treatment given as part of a trial ".repeat(2);
    let long = &long[..80];
    let table = source(&[
        ("person_id", &[Some("1")]),
        ("dsstdat", &[Some("2020-03-01")]),
        ("other_cmyn", &[Some("1")]),
        ("other_cmtrt", &[Some(long)]),
    ]);

    let reports = DrugPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    assert_eq!(reports[0].written, 1);
    assert_eq!(reports[1].written, 0);
    assert_eq!(reports[1].truncated, 1);
    let written = rows(
        &store,
        CdmTable::ProcedureOccurrence,
        &["procedure_concept_id", "procedure_source_value"],
    );
    assert_eq!(written[0][0], text("0"));
    assert_eq!(written[0][1], Some(long[..50].to_string()));
}

#[test]
fn antiviral_yields_treatment_and_drug() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("1")]),
        ("dsstdat", &[Some("2020-03-01"), Some("2020-03-01")]),
        ("daily_dsstdat", &[None, Some("2020-03-04")]),
        ("antiviral_cmyn", &[Some("1"), Some("2")]),
        ("antiviral_cmtrt", &[Some("Oseltamivir"), None]),
        ("antiviral_cmdat", &[Some("2020-03-02"), None]),
        ("antiviral_cmroute", &[Some("oral"), None]),
    ]);

    let reports = DrugPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    assert_eq!(reports[0].written, 1);
    assert_eq!(reports[1].written, 1);
    assert_eq!(reports[1].dropped_unavailable, 1);
    assert_eq!(reports[0].dropped_unavailable, 1);
    let drugs = rows(
        &store,
        CdmTable::DrugExposure,
        &["drug_concept_id", "drug_exposure_start_date", "route_source_value"],
    );
    assert_eq!(
        drugs,
        vec![vec![
            registry.drug.lexicon_match("oseltamivir").map(|id| id.to_string()),
            text("2020-03-02"),
            text("oral")
        ]]
    );
}

#[test]
fn treatment_answered_in_trt_needs_a_yes() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("1"), Some("1")]),
        (
            "dsstdat",
            &[Some("2020-03-01"), Some("2020-03-01"), Some("2020-03-01")],
        ),
        ("daily_neuro_cmtrt", &[Some("1"), Some("2"), Some("3")]),
        ("daily_prone_cmtrt", &[Some("3"), None, None]),
        ("inhalednit_cmtrt", &[Some("2"), None, None]),
    ]);

    let reports = DrugPopulator::new()
        .unwrap()
        .populate(&table, &mut store, &ctx)
        .unwrap();
    let treatments = &reports[0];
    assert_eq!(treatments.candidates, 5);
    assert_eq!(treatments.written, 1);
    assert_eq!(treatments.dropped_unavailable, 4);
    assert_eq!(
        treatments.written + treatments.dropped(),
        treatments.candidates
    );
    assert_eq!(reports[1].written, 0);
    assert_eq!(reports[1].dropped_no_concept, 1);
    let written = rows(
        &store,
        CdmTable::ProcedureOccurrence,
        &["procedure_concept_id", "procedure_source_value"],
    );
    assert_eq!(written, vec![vec![text("4084313"), text("daily_neuro_cm")]]);
}

#[test]
fn icu_stay_links_visit_and_procedure() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("icu_hoterm", &[Some("1"), Some("1")]),
        ("icu_hostdat", &[Some("2020-03-02"), Some("2020-03-05")]),
        ("icu_hoendat", &[Some("2020-03-09"), None]),
    ]);

    let reports = IcuVisitPopulator.populate(&table, &mut store, &ctx).unwrap();
    assert_eq!(reports[0].written, 1);
    assert_eq!(reports[0].dropped_no_date, 1);
    let visits = rows(
        &store,
        CdmTable::VisitOccurrence,
        &["visit_concept_id", "visit_start_date", "visit_end_date"],
    );
    assert_eq!(
        visits,
        vec![vec![text("32037"), text("2020-03-02"), text("2020-03-09")]]
    );
    let procedures = rows(
        &store,
        CdmTable::ProcedureOccurrence,
        &["procedure_concept_id", "visit_occurrence_id", "procedure_date"],
    );
    assert_eq!(
        procedures,
        vec![vec![text("4138933"), text("1"), text("2020-03-02")]]
    );
}

#[test]
fn keys_continue_across_populator_runs() {
    let registry = ConceptRegistry::load_default().unwrap();
    let ctx = PopulateContext::new(&registry);
    let mut store = DuckDbStore::open_in_memory().unwrap();
    let table = source(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("dsstdat", &[Some("2020-03-01"), Some("2020-03-02")]),
        ("cough_ceoccur_v2_yn", &[Some("1"), Some("1")]),
        ("headache_ceoccur_v2_yn", &[Some("1"), Some("2")]),
    ]);
    let populator = ConditionPopulator::new().unwrap();

    let first = populator.populate(&table, &mut store, &ctx).unwrap();
    assert_eq!((first[0].first_id, first[0].written), (Some(1), 3));
    let second = populator.populate(&table, &mut store, &ctx).unwrap();
    assert_eq!((second[0].first_id, second[0].written), (Some(4), 3));
    assert_eq!(
        store
            .max_value(CdmTable::ConditionOccurrence, "condition_occurrence_id")
            .unwrap(),
        Some(6)
    );
}
