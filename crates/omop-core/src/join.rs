//! Sibling-column joiner: reads one family's columns for one source row.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use omop_ingest::{SourceTable, parse_code, parse_date};
use omop_model::YesNo;

use crate::pattern::{FamilyGrammar, Role, VariableFamily};

/// State of the family's availability indicator for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The family has no `yn` column.
    NotApplicable,
    /// The `yn` cell; `None` when empty or not a known code.
    Reported(Option<YesNo>),
}

/// One row's view of a variable family. Missing siblings are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub value: Option<String>,
    pub value_role: Option<Role>,
    pub availability: Availability,
    pub unit: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub route: Option<String>,
    pub kind: Option<String>,
    pub treatment: Option<String>,
}

/// Source columns loaded on first use. Families share general columns, so
/// each column is pulled out of the frame once per populator.
#[derive(Debug)]
pub struct ColumnCache<'a> {
    source: &'a SourceTable,
    columns: HashMap<String, Vec<Option<String>>>,
}

impl<'a> ColumnCache<'a> {
    pub fn new(source: &'a SourceTable) -> Self {
        Self {
            source,
            columns: HashMap::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.source.height()
    }

    pub fn column(&mut self, name: &str) -> Result<&[Option<String>]> {
        if !self.columns.contains_key(name) {
            let values = self.source.column_values(name)?;
            self.columns.insert(name.to_string(), values);
        }
        Ok(self
            .columns
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn cell(&mut self, name: &str, row: usize) -> Result<Option<String>> {
        Ok(self.column(name)?.get(row).cloned().flatten())
    }

    fn role_cell(
        &mut self,
        family: &VariableFamily,
        role: Role,
        row: usize,
    ) -> Result<Option<String>> {
        match family.column(role) {
            Some(column) => self.cell(column, row),
            None => Ok(None),
        }
    }
}

/// Joins the family's columns for every source row.
pub fn join_family(
    cache: &mut ColumnCache<'_>,
    family: &VariableFamily,
    grammar: &FamilyGrammar,
) -> Result<Vec<Composite>> {
    (0..cache.height())
        .map(|row| join_row(cache, family, grammar, row))
        .collect()
}

pub fn join_row(
    cache: &mut ColumnCache<'_>,
    family: &VariableFamily,
    grammar: &FamilyGrammar,
    row: usize,
) -> Result<Composite> {
    let mut value = None;
    let mut value_role = None;
    for role in grammar.value_roles() {
        if let Some(cell) = cache.role_cell(family, *role, row)? {
            value = Some(cell);
            value_role = Some(*role);
            break;
        }
    }

    let availability = if family.has_role(Role::Yn) {
        let code = cache
            .role_cell(family, Role::Yn, row)?
            .as_deref()
            .and_then(parse_code);
        Availability::Reported(code.and_then(YesNo::from_code))
    } else {
        Availability::NotApplicable
    };

    let date = |cell: Option<String>| cell.as_deref().and_then(parse_date);
    Ok(Composite {
        value,
        value_role,
        availability,
        unit: cache.role_cell(family, Role::Orresu, row)?,
        start: date(cache.role_cell(family, Role::Dat, row)?),
        end: date(cache.role_cell(family, Role::End, row)?),
        route: cache.role_cell(family, Role::Route, row)?,
        kind: cache.role_cell(family, Role::Type, row)?,
        treatment: cache.role_cell(family, Role::Trt, row)?,
    })
}
