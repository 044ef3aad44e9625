use omop_model::ConceptId;
use omop_vocab::ConceptRegistry;
use proptest::prelude::*;

fn registry() -> ConceptRegistry {
    ConceptRegistry::load_default().expect("load embedded concept table")
}

#[test]
fn embedded_table_validates() {
    let registry = registry();
    assert_eq!(registry.type_concept, ConceptId::new(764466));
    assert_eq!(registry.visit.intensive_care, ConceptId::new(32037));
    assert_eq!(registry.visit.icu_admission_procedure, ConceptId::new(4138933));
    for domain in registry.domains() {
        assert!(domain.entries > 0, "{} is empty", domain.name);
    }
}

#[test]
fn condition_lookups() {
    let registry = registry();
    assert_eq!(
        registry.condition.get("cough_ceoccur_v2"),
        Some(ConceptId::new(4038519))
    );
    assert_eq!(
        registry.condition.get("chroniccard_mhyn"),
        Some(ConceptId::new(4134586))
    );
    assert_eq!(registry.condition.get("other_ceoccur"), Some(ConceptId::UNMAPPED));
    assert_eq!(registry.condition.get("fever_ceoccur_v2"), None);
}

#[test]
fn treatment_sentinel_is_kept_as_zero() {
    let registry = registry();
    assert_eq!(
        registry.treatment_procedure.get("other_cm"),
        Some(ConceptId::UNMAPPED)
    );
    assert_eq!(
        registry.treatment_procedure.get("antiviral_cm"),
        Some(ConceptId::new(4140762))
    );
}

#[test]
fn measurement_units_resolve() {
    let registry = registry();
    let temp = registry.measurement("temp_vs").expect("temp_vs");
    assert_eq!(temp.concept, ConceptId::new(4174894));
    let set = temp.unit_codes.as_deref().expect("coded unit");
    assert_eq!(registry.unit_for_code(set, 2), Some("fahrenheit"));
    assert_eq!(
        registry.unit_concept("celsius"),
        Some(ConceptId::new(586323))
    );

    let fio2 = registry.measurement("daily_fi02_lb").expect("fio2");
    assert_eq!(fio2.unit.as_deref(), Some("percent"));
    assert_eq!(fio2.range_low, Some(0.2));
    assert_eq!(fio2.range_high, Some(1.0));
}

#[test]
fn person_codes() {
    let registry = registry();
    let person = &registry.person;
    assert_eq!(person.sex(1).map(|s| s.concept), Some(ConceptId::new(8507)));
    assert_eq!(person.sex(2).map(|s| s.label.as_str()), Some("Female"));
    let latin = person.ethnic(6).expect("latin american");
    assert_eq!(latin.ethnicity, Some(ConceptId::new(38003563)));
    assert_eq!(person.race_for_label("South Asian"), ConceptId::new(8515));
    assert_eq!(person.race_for_label("Basque"), person.race_other);
}

#[test]
fn drug_lookups() {
    let registry = registry();
    assert_eq!(
        registry.drug.coded("antiviral_cm", 1),
        Some(ConceptId::new(4291865))
    );
    assert_eq!(registry.drug.coded("antiviral_cm", 6), None);
    assert_eq!(
        registry.drug.lexicon_match("Tamiflu 75 mg bid"),
        Some(ConceptId::new(4333524))
    );
    assert_eq!(registry.drug.lexicon_match("paracetamol"), None);
}

#[test]
fn country_table_covers_all_codes() {
    let registry = registry();
    assert_eq!(registry.country_name("1"), Some("Afghanistan"));
    assert_eq!(registry.country_name("126"), Some("Netherlands"));
    assert_eq!(registry.country_name("197"), Some("Other"));
    assert_eq!(registry.country_name("198"), None);
}

proptest! {
    #[test]
    fn lexicon_matching_ignores_case(upper in proptest::bool::ANY, suffix in "[ a-z0-9]{0,12}") {
        let registry = registry();
        let name = if upper { "RIBAVIRIN" } else { "ribavirin" };
        let text = format!("{name}{}", if suffix.starts_with(' ') { suffix.clone() } else { String::new() });
        prop_assert_eq!(registry.drug.lexicon_match(&text), Some(ConceptId::new(4291865)));
    }
}
