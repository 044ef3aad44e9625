//! In-memory source table: one nullable string column per CSV column.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::{BooleanChunked, Column, DataFrame, NamedFrom, NewChunkedArray, Series};

use crate::values::{parse_code, parse_date};

/// Read-only view of the input rows. Cells are text; numbers and dates are
/// parsed on demand by the caller. Empty cells are null.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    frame: DataFrame,
}

impl SourceTable {
    pub fn from_columns(columns: Vec<(String, Vec<Option<String>>)>) -> Result<Self> {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| Series::new(name.as_str().into(), values).into())
            .collect();
        let frame = DataFrame::new(columns).context("build source frame")?;
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn headers(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// All cells of a column. A column absent from this dataset reads as
    /// all-null rather than failing.
    pub fn column_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let Ok(column) = self.frame.column(name) else {
            return Ok(vec![None; self.height()]);
        };
        let values = column
            .str()
            .with_context(|| format!("source column {name} is not text"))?
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();
        Ok(values)
    }

    pub fn code_values(&self, name: &str) -> Result<Vec<Option<i64>>> {
        Ok(self
            .column_values(name)?
            .into_iter()
            .map(|value| value.as_deref().and_then(parse_code))
            .collect())
    }

    pub fn date_values(&self, name: &str) -> Result<Vec<Option<NaiveDate>>> {
        Ok(self
            .column_values(name)?
            .into_iter()
            .map(|value| value.as_deref().and_then(parse_date))
            .collect())
    }

    pub fn set_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        let series = Series::new(name.into(), values);
        self.frame
            .with_column(series)
            .with_context(|| format!("set source column {name}"))?;
        Ok(())
    }

    /// Nulls `name` on every row where `mask` is true.
    pub fn null_where(&mut self, name: &str, mask: &[bool]) -> Result<()> {
        if !self.has_column(name) {
            return Ok(());
        }
        let values = self
            .column_values(name)?
            .into_iter()
            .zip(mask)
            .map(|(value, null)| if *null { None } else { value })
            .collect();
        self.set_column(name, values)
    }

    pub fn filter_rows(&mut self, keep: &[bool]) -> Result<()> {
        let mask = BooleanChunked::from_slice("keep".into(), keep);
        self.frame = self.frame.filter(&mask).context("filter source rows")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SourceTable {
        SourceTable::from_columns(vec![
            (
                "subjid".to_string(),
                vec![Some("A1".to_string()), Some("A2".to_string())],
            ),
            ("sex".to_string(), vec![Some("1.0".to_string()), None]),
        ])
        .unwrap()
    }

    #[test]
    fn missing_columns_read_as_null() {
        let table = table();
        assert_eq!(table.column_values("hostdat").unwrap(), vec![None, None]);
    }

    #[test]
    fn codes_are_parsed_on_demand() {
        let table = table();
        assert_eq!(table.code_values("sex").unwrap(), vec![Some(1), None]);
    }

    #[test]
    fn null_where_and_filter() {
        let mut table = table();
        table.null_where("subjid", &[true, false]).unwrap();
        assert_eq!(
            table.column_values("subjid").unwrap(),
            vec![None, Some("A2".to_string())]
        );
        table.filter_rows(&[false, true]).unwrap();
        assert_eq!(table.height(), 1);
        assert_eq!(table.code_values("sex").unwrap(), vec![None]);
    }
}
