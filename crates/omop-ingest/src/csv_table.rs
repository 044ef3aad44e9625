use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::debug;

use crate::source::SourceTable;
use crate::values::parse_code;

/// Raw cells of a delimited file, header row first.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("read header: {}", path.display()))?
        .iter()
        .map(normalize_header)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let mut row = Vec::with_capacity(headers.len());
        for idx in 0..headers.len() {
            row.push(record.get(idx).map(normalize_cell).unwrap_or_default());
        }
        rows.push(row);
    }
    debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "read csv table"
    );
    Ok(CsvTable { headers, rows })
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Collapses checkbox columns `<base>___<N>` into a single `<base>`
    /// column holding the lowest checked `N`. Rows with nothing checked keep
    /// the existing `<base>` value. The checkbox columns are removed.
    pub fn merge_checkbox_columns(&mut self, base: &str) {
        let prefix = format!("{base}___");
        let mut boxes: BTreeMap<i64, usize> = BTreeMap::new();
        for (idx, header) in self.headers.iter().enumerate() {
            if let Some(code) = header.strip_prefix(&prefix).and_then(|rest| rest.parse().ok()) {
                boxes.insert(code, idx);
            }
        }
        if boxes.is_empty() {
            return;
        }

        let base_idx = self.column_index(base);
        let merged: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                boxes
                    .iter()
                    .find(|(_, idx)| row.get(**idx).map(String::as_str).and_then(parse_code) == Some(1))
                    .map(|(code, _)| code.to_string())
                    .or_else(|| base_idx.and_then(|idx| row.get(idx).cloned()))
                    .unwrap_or_default()
            })
            .collect();

        let drop: Vec<usize> = boxes.into_values().collect();
        let keep: Vec<bool> = (0..self.headers.len())
            .map(|idx| !drop.contains(&idx) && Some(idx) != base_idx)
            .collect();
        self.headers = retain_flags(std::mem::take(&mut self.headers), &keep);
        self.headers.push(base.to_string());
        for (row, value) in self.rows.iter_mut().zip(merged) {
            let mut kept = retain_flags(std::mem::take(row), &keep);
            kept.push(value);
            *row = kept;
        }
    }

    pub fn into_source_table(self) -> Result<SourceTable> {
        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(self.rows.len()); self.headers.len()];
        for row in self.rows {
            for (idx, cell) in row.into_iter().enumerate().take(columns.len()) {
                columns[idx].push(if cell.is_empty() { None } else { Some(cell) });
            }
        }
        SourceTable::from_columns(self.headers.into_iter().zip(columns).collect())
    }
}

fn retain_flags<T>(values: Vec<T>, keep: &[bool]) -> Vec<T> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(value, keep)| keep.then_some(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| (*v).to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn merges_checkbox_columns() {
        let mut csv = table(
            &["subjid", "ethnic", "ethnic___2", "ethnic___10"],
            &[&["A", "", "", "1"], &["B", "", "1", ""], &["C", "", "", "1.0"]],
        );
        csv.merge_checkbox_columns("ethnic");
        assert_eq!(csv.headers, vec!["subjid", "ethnic"]);
        let merged: Vec<&str> = csv.rows.iter().map(|row| row[1].as_str()).collect();
        assert_eq!(merged, vec!["10", "2", "10"]);
    }

    #[test]
    fn merge_without_base_column_adds_it() {
        let mut csv = table(&["subjid", "ethnic___7"], &[&["A", "1"], &["B", "0"]]);
        csv.merge_checkbox_columns("ethnic");
        assert_eq!(csv.headers, vec!["subjid", "ethnic"]);
        assert_eq!(csv.rows[0], vec!["A", "7"]);
        assert_eq!(csv.rows[1], vec!["B", ""]);
    }

    #[test]
    fn merge_keeps_existing_value_when_nothing_checked() {
        let mut csv = table(&["ethnic", "ethnic___3"], &[&["5", "0"]]);
        csv.merge_checkbox_columns("ethnic");
        assert_eq!(csv.rows[0], vec!["5"]);
    }

    #[test]
    fn normalizes_bom_and_whitespace() {
        assert_eq!(normalize_header("\u{feff}subjid "), "subjid");
        assert_eq!(normalize_cell(" 1 "), "1");
    }
}
