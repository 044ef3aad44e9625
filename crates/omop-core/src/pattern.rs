//! Column discovery: groups source columns into variable families by naming
//! convention.
//!
//! A column name reads `<core><role><repeat>`. A [`FamilyGrammar`] says which
//! names belong to a populator, which role tokens exist and which roles carry
//! the value of the fact.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Yn,
    Orres,
    Orresu,
    Dat,
    End,
    Trt,
    Route,
    Type,
    Term,
    Occur,
    Perf,
}

/// Repeat suffix of a column: `_2` for repeated entries, `___2` for a
/// checkbox option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Repeat {
    Index(u32),
    Checkbox(u32),
}

impl Repeat {
    pub fn parse(suffix: &str) -> Option<Self> {
        if let Some(code) = suffix.strip_prefix("___") {
            return code.parse().ok().map(Self::Checkbox);
        }
        suffix
            .strip_prefix('_')
            .and_then(|code| code.parse().ok())
            .map(Self::Index)
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Index(code) | Self::Checkbox(code) => code,
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(code) => write!(f, "_{code}"),
            Self::Checkbox(code) => write!(f, "___{code}"),
        }
    }
}

/// Declarative description of one populator's column family.
///
/// Patterns are anchored regexes with a `core` group and optional `role`
/// and `repeat` groups. A missing `role` group reads as the empty token.
#[derive(Debug, Clone)]
pub struct FamilyGrammar {
    name: &'static str,
    patterns: Vec<Regex>,
    roles: Vec<(Role, &'static str)>,
    value_roles: Vec<Role>,
    flag_roles: Vec<Role>,
    exclude_cores: Vec<&'static str>,
}

impl FamilyGrammar {
    pub fn new(name: &'static str, patterns: &[&str]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            patterns,
            roles: Vec::new(),
            value_roles: Vec::new(),
            flag_roles: Vec::new(),
            exclude_cores: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_role(mut self, role: Role, token: &'static str) -> Self {
        self.roles.push((role, token));
        self
    }

    /// Roles whose column holds the fact value, in preference order.
    #[must_use]
    pub fn with_value_roles(mut self, roles: &[Role]) -> Self {
        self.value_roles = roles.to_vec();
        self
    }

    /// Roles whose column holds an ISARIC yes/no/not-available code.
    #[must_use]
    pub fn with_flag_roles(mut self, roles: &[Role]) -> Self {
        self.flag_roles = roles.to_vec();
        self
    }

    #[must_use]
    pub fn excluding(mut self, core: &'static str) -> Self {
        self.exclude_cores.push(core);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_roles(&self) -> &[Role] {
        &self.value_roles
    }

    pub fn is_flag(&self, role: Role) -> bool {
        self.flag_roles.contains(&role)
    }

    fn role_for_token(&self, token: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|(_, candidate)| *candidate == token)
            .map(|(role, _)| *role)
    }

    fn parse(&self, column: &str) -> Option<(String, Role, Option<Repeat>)> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(column)?;
            let core = captures.name("core")?.as_str();
            if self.exclude_cores.iter().any(|excluded| *excluded == core) {
                return None;
            }
            let token = captures.name("role").map_or("", |m| m.as_str());
            let role = self.role_for_token(token)?;
            let repeat = match captures.name("repeat") {
                Some(suffix) => Some(Repeat::parse(suffix.as_str())?),
                None => None,
            };
            Some((core.to_string(), role, repeat))
        })
    }
}

/// Sibling columns describing one clinical variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableFamily {
    pub core: String,
    pub repeat: Option<Repeat>,
    pub columns: BTreeMap<Role, String>,
}

impl VariableFamily {
    /// Core name plus repeat suffix; the key used for concept lookup.
    pub fn variable(&self) -> String {
        match self.repeat {
            Some(repeat) => format!("{}{repeat}", self.core),
            None => self.core.clone(),
        }
    }

    pub fn column(&self, role: Role) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(self.repeat, Some(Repeat::Checkbox(_)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FamilySet {
    /// Every column the grammar matched, including those of discarded
    /// families.
    pub matched_columns: BTreeSet<String>,
    /// Families keyed by variable name.
    pub families: BTreeMap<String, VariableFamily>,
}

impl FamilySet {
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn get(&self, variable: &str) -> Option<&VariableFamily> {
        self.families.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Families sharing a core name, e.g. every repeat of `antiviral_cm`.
    pub fn with_core<'a>(&'a self, core: &'a str) -> impl Iterator<Item = &'a VariableFamily> {
        self.families
            .values()
            .filter(move |family| family.core == core)
    }
}

/// Groups `headers` into families. Families without a value-bearing column
/// are dropped; a family may lack any other sibling.
pub fn discover_families(headers: &[String], grammar: &FamilyGrammar) -> FamilySet {
    let mut set = FamilySet::default();
    for header in headers {
        let Some((core, role, repeat)) = grammar.parse(header) else {
            continue;
        };
        set.matched_columns.insert(header.clone());
        let family = VariableFamily {
            core,
            repeat,
            columns: BTreeMap::new(),
        };
        set.families
            .entry(family.variable())
            .or_insert(family)
            .columns
            .entry(role)
            .or_insert_with(|| header.clone());
    }
    set.families.retain(|_, family| {
        grammar
            .value_roles
            .iter()
            .any(|role| family.has_role(*role))
    });
    set
}
