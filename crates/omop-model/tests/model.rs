use omop_model::{CdmTable, ConceptId, RunSummary, TableReport, YesNo};

#[test]
fn unmapped_sentinel_is_zero() {
    assert_eq!(ConceptId::UNMAPPED.get(), 0);
    assert!(ConceptId::new(0).is_unmapped());
    assert!(!ConceptId::new(4038519).is_unmapped());
}

#[test]
fn yes_no_codes_round_trip() {
    for code in 1..=3 {
        let value = YesNo::from_code(code).expect("known code");
        assert_eq!(value.code(), code);
    }
    assert_eq!(YesNo::from_code(0), None);
    assert!(YesNo::from_code(1).is_some_and(YesNo::is_yes));
    assert!(!YesNo::NotAvailable.is_yes());
}

#[test]
fn summary_serializes_with_table_names() {
    let mut report = TableReport::new("condition", CdmTable::ConditionOccurrence);
    report.written = 3;
    report.dropped_no_date = 1;
    report.unmapped_variables = vec!["fever_ceoccur_v2".to_string()];
    let summary = RunSummary {
        source: "site.csv".to_string(),
        source_rows: 4,
        persons: 2,
        tables: vec![report],
    };

    let json = serde_json::to_value(&summary).expect("serialize summary");
    assert_eq!(json["tables"][0]["table"], "condition_occurrence");
    assert_eq!(summary.total_written(), 3);
    assert_eq!(summary.total_dropped(), 1);
    assert_eq!(summary.tables[0].warning_count(), 2);
}
