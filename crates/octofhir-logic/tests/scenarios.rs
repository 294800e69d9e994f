//! Whole-library scenarios exercising criteria, sources, rules and caching
//! together through the public facade.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use octofhir_logic::model::memory::{MemoryObservationSource, MemoryPersonSource};
use octofhir_logic::{
    AgeRule, Cohort, Concept, Criteria, Duration, LogicContext, MemoryCache, Operand,
    ReferenceRule, RuleRegistry, SourceRegistry, SubjectId,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).single().unwrap()
}

fn p1() -> SubjectId {
    SubjectId::new("p1")
}

fn p2() -> SubjectId {
    SubjectId::new("p2")
}

fn cohort() -> Cohort {
    ["p1", "p2"].into_iter().collect()
}

/// Observation records for two subjects, one of them without any CD4 data.
fn observations() -> MemoryObservationSource {
    let mut source = MemoryObservationSource::new();
    source.define_concept(Concept::new(5497, "CD4 COUNT"));
    source.define_concept(Concept::new(5089, "WEIGHT"));
    source.insert("p1", "CD4 COUNT", 100, day(1)).unwrap();
    source.insert("p1", "CD4 COUNT", 600, day(2)).unwrap();
    source.insert("p1", "WEIGHT", 80, day(3)).unwrap();
    source.insert("p2", "WEIGHT", 65, day(4)).unwrap();
    source
}

fn registries() -> (RuleRegistry, SourceRegistry) {
    let mut sources = SourceRegistry::new();
    sources.register(Arc::new(observations()));

    let mut rules = RuleRegistry::new();
    rules.register(
        "CD4 COUNT",
        Arc::new(ReferenceRule::new("observation", "CD4 COUNT")),
    );
    rules.register("WEIGHT", Arc::new(ReferenceRule::new("observation", "WEIGHT")));
    (rules, sources)
}

#[test]
fn test_last_returns_the_latest_fact_and_empty_for_missing_subjects() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let latest = Criteria::token("CD4 COUNT").last();
    let results = context.eval_cohort(&latest).unwrap();

    let p1_facts = &results[&p1()];
    assert_eq!(p1_facts.len(), 1);
    assert_eq!(p1_facts.to_numeric(), Some(Decimal::from(600)));
    assert_eq!(p1_facts.first().map(|f| f.effective()), Some(day(2)));
    assert!(!results.contains_key(&p2()));
    assert!(context.eval(&p2(), &latest).unwrap().is_empty());
}

#[test]
fn test_count_answers_zero_for_subjects_without_facts() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let how_many = Criteria::token("CD4 COUNT").count();
    assert_eq!(
        context.eval(&p1(), &how_many).unwrap().to_numeric(),
        Some(Decimal::from(2))
    );
    assert_eq!(
        context.eval(&p2(), &how_many).unwrap().to_numeric(),
        Some(Decimal::ZERO)
    );
}

#[test]
fn test_average_yields_no_value_for_subjects_without_facts() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let mean = Criteria::token("CD4 COUNT").average();
    assert_eq!(
        context.eval(&p1(), &mean).unwrap().to_numeric(),
        Some(Decimal::from(350))
    );
    assert!(context.eval(&p2(), &mean).unwrap().is_empty());
}

#[test]
fn test_conjunction_narrows_one_fetched_stream() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let low_and_early = Criteria::token("CD4 COUNT").lt(200).unwrap().before(day(2));
    let facts = context.eval(&p1(), &low_and_early).unwrap();

    assert_eq!(facts.len(), 1);
    assert_eq!(facts.to_numeric(), Some(Decimal::from(100)));
}

#[test]
fn test_double_negation_evaluates_to_the_base_results() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let base = Criteria::token("CD4 COUNT").lt(200).unwrap();
    let doubled = base.clone().negate().negate();

    let plain = context.eval_cohort(&base).unwrap();
    let twisted = context.eval_cohort(&doubled).unwrap();
    assert_eq!(plain, twisted);
}

#[test]
fn test_within_window_converges_regardless_of_chaining_order() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let pinned_then_windowed = Criteria::token("CD4 COUNT")
        .as_of(day(2))
        .within(Duration::days(-1));
    let windowed_then_pinned = Criteria::token("CD4 COUNT")
        .within(Duration::days(-1))
        .as_of(day(2));

    let a = context.eval(&p1(), &pinned_then_windowed).unwrap();
    let b = context.eval(&p1(), &windowed_then_pinned).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a, b);

    let empty_window = Criteria::token("CD4 COUNT")
        .as_of(day(10))
        .within(Duration::days(-1));
    assert!(context.eval(&p1(), &empty_window).unwrap().is_empty());
}

#[test]
fn test_exists_and_not_exists_answer_for_every_subject() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let any = Criteria::token("CD4 COUNT").exists();
    assert!(context.eval(&p1(), &any).unwrap().to_boolean());
    assert!(!context.eval(&p2(), &any).unwrap().to_boolean());

    let none = Criteria::token("CD4 COUNT").not_exists();
    assert!(!context.eval(&p1(), &none).unwrap().to_boolean());
    assert!(context.eval(&p2(), &none).unwrap().to_boolean());
}

#[test]
fn test_value_set_membership() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let listed = Criteria::token("CD4 COUNT")
        .is_in(vec![Operand::from(100), Operand::from(999)])
        .unwrap();
    let facts = context.eval(&p1(), &listed).unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts.to_numeric(), Some(Decimal::from(100)));
}

#[test]
fn test_disjunction_merges_two_streams() {
    let (rules, sources) = registries();
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(15));

    let low_cd4 = Criteria::token("CD4 COUNT").lt(200).unwrap();
    let heavy = Criteria::token("WEIGHT").gt(70).unwrap();
    let either = low_cd4.or(heavy);

    let results = context.eval_cohort(&either).unwrap();
    let p1_values: Vec<_> = results[&p1()]
        .iter()
        .map(|f| f.value().as_numeric())
        .collect();
    assert_eq!(
        p1_values,
        vec![Some(Decimal::from(100)), Some(Decimal::from(80))]
    );
    assert!(!results.contains_key(&p2()));
}

#[test]
fn test_age_rule_for_a_whole_cohort() {
    let mut person = MemoryPersonSource::new();
    person.insert_person(
        "p1",
        "F",
        Utc.with_ymd_and_hms(1990, 6, 15, 0, 0, 0).single().unwrap(),
        false,
        None,
    );
    person.insert_person(
        "p2",
        "M",
        Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).single().unwrap(),
        false,
        None,
    );
    let mut sources = SourceRegistry::new();
    sources.register(Arc::new(person));
    let mut rules = RuleRegistry::new();
    rules.register("AGE", Arc::new(AgeRule));
    let cache = MemoryCache::new();
    let context = LogicContext::new(&rules, &sources, &cache, cohort()).with_index_date(day(14));

    let ages = context.eval_cohort(&Criteria::token("AGE")).unwrap();
    assert_eq!(ages[&p1()].to_numeric(), Some(Decimal::from(33)));
    assert_eq!(ages[&p2()].to_numeric(), Some(Decimal::from(14)));
}

#[test]
fn test_criteria_survive_a_serde_round_trip() {
    let original = Criteria::token("CD4 COUNT")
        .lt(200)
        .unwrap()
        .last()
        .as_of(day(2))
        .with_parameter("site", "downtown");

    let json = serde_json::to_string(&original).unwrap();
    let restored: Criteria = serde_json::from_str(&json).unwrap();
    assert_eq!(original, restored);
    assert_eq!(restored.root_token(), Some("CD4 COUNT"));
}
