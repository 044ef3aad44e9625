//! Typed rows destined for a CDM table.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::concept::ConceptId;
use crate::error::{OmopError, Result};
use crate::table::{CdmTable, ColumnKind};

#[derive(Debug, Clone, PartialEq)]
pub enum CdmValue {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CdmValue {
    fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Self::Int(_), ColumnKind::Int)
                | (Self::Int(_) | Self::Float(_), ColumnKind::Float)
                | (Self::Text(_), ColumnKind::Text)
                | (Self::Date(_), ColumnKind::Date)
                | (Self::DateTime(_), ColumnKind::DateTime)
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Text form used for text, date and datetime columns.
    pub fn to_text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
            Self::DateTime(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<i64> for CdmValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CdmValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<ConceptId> for CdmValue {
    fn from(value: ConceptId) -> Self {
        Self::Int(value.get())
    }
}

impl From<f64> for CdmValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for CdmValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CdmValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<NaiveDate> for CdmValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for CdmValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// One row of a CDM table. Columns are checked against the table header
/// when set, so a misspelt column fails loudly instead of being dropped.
#[derive(Debug, Clone)]
pub struct CdmRow {
    table: CdmTable,
    values: BTreeMap<&'static str, CdmValue>,
}

impl CdmRow {
    pub fn new(table: CdmTable) -> Self {
        Self {
            table,
            values: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> CdmTable {
        self.table
    }

    pub fn set(&mut self, column: &str, value: impl Into<CdmValue>) -> Result<&mut Self> {
        let def = self
            .table
            .column(column)
            .ok_or_else(|| OmopError::UnknownColumn {
                table: self.table,
                column: column.to_string(),
            })?;
        let value = value.into();
        if !value.fits(def.kind) {
            return Err(OmopError::TypeMismatch {
                table: self.table,
                column: column.to_string(),
                expected: def.kind.sql_type(),
            });
        }
        self.values.insert(def.name, value);
        Ok(self)
    }

    pub fn set_opt<V: Into<CdmValue>>(
        &mut self,
        column: &str,
        value: Option<V>,
    ) -> Result<&mut Self> {
        match value {
            Some(value) => self.set(column, value),
            None => Ok(self),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CdmValue> {
        self.values.get(column)
    }
}
