use std::io::Write;

use omop_ingest::read_csv_table;
use proptest::prelude::*;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

#[test]
fn reads_headers_and_rows() {
    let file = write_csv("\u{feff}subjid,sex,dsstdat\nA1,1,2020-03-01\nA2, 2 ,\n");
    let table = read_csv_table(file.path()).expect("read csv");
    assert_eq!(table.headers, vec!["subjid", "sex", "dsstdat"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[1], vec!["A2", "2", ""]);
}

#[test]
fn skips_blank_rows_and_pads_short_rows() {
    let file = write_csv("subjid,sex,dsstdat\n,,\nA1\n");
    let table = read_csv_table(file.path()).expect("read csv");
    assert_eq!(table.rows, vec![vec!["A1".to_string(), String::new(), String::new()]]);
}

#[test]
fn empty_cells_become_null_in_source_table() {
    let file = write_csv("subjid,cough_ceoccur_v2_yn,dsstdat\nA1,1,2020-03-01\nA2,,\n");
    let source = read_csv_table(file.path())
        .expect("read csv")
        .into_source_table()
        .expect("source table");
    assert_eq!(source.height(), 2);
    assert_eq!(
        source.code_values("cough_ceoccur_v2_yn").unwrap(),
        vec![Some(1), None]
    );
    assert_eq!(source.date_values("dsstdat").unwrap()[1], None);
}

#[test]
fn missing_file_is_an_error() {
    let error = read_csv_table(std::path::Path::new("/nonexistent/isaric.csv")).unwrap_err();
    assert!(error.to_string().contains("read csv"));
}

proptest! {
    #[test]
    fn integer_codes_survive_float_spelling(code in -1000i64..1000) {
        prop_assert_eq!(omop_ingest::parse_code(&format!("{code}.0")), Some(code));
        prop_assert_eq!(omop_ingest::parse_code(&code.to_string()), Some(code));
    }
}
