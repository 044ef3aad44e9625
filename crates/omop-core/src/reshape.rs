//! Wide-to-long reshaping: one fact candidate per (row, family) pair with a
//! value.

use std::collections::BTreeMap;

use anyhow::Result;
use omop_ingest::{SourceTable, parse_code};

use crate::join::{ColumnCache, Composite, join_family};
use crate::pattern::{FamilyGrammar, FamilySet, Repeat};

/// Column holding the resolved person id, added by identity resolution.
pub const PERSON_ID_COLUMN: &str = "person_id";

#[derive(Debug, Clone, PartialEq)]
pub struct FactCandidate {
    pub row: usize,
    pub person_id: Option<i64>,
    pub variable: String,
    pub core: String,
    pub repeat: Option<Repeat>,
    pub composite: Composite,
    /// Row-level columns shared by every family (dates, flags).
    pub general: BTreeMap<String, Option<String>>,
}

impl FactCandidate {
    pub fn general(&self, column: &str) -> Option<&str> {
        self.general.get(column).and_then(|value| value.as_deref())
    }

    pub fn value(&self) -> Option<&str> {
        self.composite.value.as_deref()
    }
}

/// Melts every family into one candidate stream.
///
/// Candidates come out row-major, and within a row in variable-name order.
/// Rows whose value cell is null produce nothing for that family.
pub fn reshape(
    source: &SourceTable,
    families: &FamilySet,
    grammar: &FamilyGrammar,
    general: &[&str],
) -> Result<Vec<FactCandidate>> {
    let mut cache = ColumnCache::new(source);
    let joined = families
        .families
        .values()
        .map(|family| -> Result<_> { Ok((family, join_family(&mut cache, family, grammar)?)) })
        .collect::<Result<Vec<_>>>()?;

    let person_ids: Vec<Option<i64>> = cache
        .column(PERSON_ID_COLUMN)?
        .iter()
        .map(|value| value.as_deref().and_then(parse_code))
        .collect();
    let mut general_columns = Vec::with_capacity(general.len());
    for name in general {
        general_columns.push((*name, cache.column(name)?.to_vec()));
    }

    let mut candidates = Vec::new();
    for row in 0..source.height() {
        for (family, composites) in &joined {
            let composite = &composites[row];
            if composite.value.is_none() {
                continue;
            }
            candidates.push(FactCandidate {
                row,
                person_id: person_ids[row],
                variable: family.variable(),
                core: family.core.clone(),
                repeat: family.repeat,
                composite: composite.clone(),
                general: general_columns
                    .iter()
                    .map(|(name, values)| ((*name).to_string(), values[row].clone()))
                    .collect(),
            });
        }
    }
    Ok(candidates)
}
