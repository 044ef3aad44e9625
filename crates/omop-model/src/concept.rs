//! Concept identifiers and the ISARIC yes/no enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer key into a standard OMOP vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(i64);

impl ConceptId {
    /// "No matching concept". Rows carrying it are kept, unlike rows whose
    /// variable has no registry entry at all.
    pub const UNMAPPED: ConceptId = ConceptId(0);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn is_unmapped(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConceptId> for i64 {
    fn from(value: ConceptId) -> Self {
        value.0
    }
}

/// ISARIC yes / no / not-available coding used by availability columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YesNo {
    Yes,
    No,
    NotAvailable,
}

impl YesNo {
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Yes),
            2 => Some(Self::No),
            3 => Some(Self::NotAvailable),
            _ => None,
        }
    }

    pub const fn code(self) -> i64 {
        match self {
            Self::Yes => 1,
            Self::No => 2,
            Self::NotAvailable => 3,
        }
    }

    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}
