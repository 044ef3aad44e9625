//! Concept resolution with one aggregated warning per stage.

use std::collections::BTreeSet;

use omop_model::ConceptId;
use tracing::warn;

/// Facts paired with their concept, plus what could not be resolved.
#[derive(Debug)]
pub struct Resolved<T> {
    pub facts: Vec<(T, ConceptId)>,
    pub dropped: usize,
    pub unresolved_variables: Vec<String>,
}

/// Looks up a concept for every fact and drops those without one.
///
/// `ConceptId::UNMAPPED` is a real answer ("no standard concept") and the
/// fact is kept; only a missing entry drops it.
pub fn resolve_concepts<T>(
    stage: &str,
    facts: Vec<T>,
    variable: impl Fn(&T) -> &str,
    lookup: impl Fn(&T) -> Option<ConceptId>,
) -> Resolved<T> {
    let mut resolved = Vec::with_capacity(facts.len());
    let mut unresolved = BTreeSet::new();
    let mut dropped = 0;
    for fact in facts {
        match lookup(&fact) {
            Some(concept) => resolved.push((fact, concept)),
            None => {
                unresolved.insert(variable(&fact).to_string());
                dropped += 1;
            }
        }
    }
    let unresolved_variables: Vec<String> = unresolved.into_iter().collect();
    if dropped > 0 {
        warn!(
            stage,
            rows = dropped,
            variables = %unresolved_variables.join(", "),
            "rows dropped without a concept"
        );
    }
    Resolved {
        facts: resolved,
        dropped,
        unresolved_variables,
    }
}

#[cfg(test)]
mod tests {
    use omop_vocab::ConceptMap;

    use super::*;

    #[test]
    fn unmapped_sentinel_is_kept_and_unknown_is_dropped() {
        let map: ConceptMap = [
            ("cough_ceoccur_v2", ConceptId::new(4038519)),
            ("other_ceoccur", ConceptId::UNMAPPED),
        ]
        .into_iter()
        .collect();
        let facts = vec![
            "cough_ceoccur_v2",
            "other_ceoccur",
            "mystery_ceoccur_v2",
            "mystery_ceoccur_v2",
        ];
        let resolved = resolve_concepts("condition", facts, |fact| *fact, |fact| map.get(fact));
        assert_eq!(
            resolved.facts,
            vec![
                ("cough_ceoccur_v2", ConceptId::new(4038519)),
                ("other_ceoccur", ConceptId::UNMAPPED)
            ]
        );
        assert_eq!(resolved.dropped, 2);
        assert_eq!(resolved.unresolved_variables, vec!["mystery_ceoccur_v2"]);
    }
}
