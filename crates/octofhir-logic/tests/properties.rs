//! Property tests over transforms and reference-date windows.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use octofhir_logic::model::memory::MemoryObservationSource;
use octofhir_logic::{
    Cohort, Concept, Criteria, Duration, LogicContext, NoopCache, ReferenceRule, RuleRegistry,
    SourceRegistry, SubjectId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).single().unwrap()
}

/// One subject with one fact per calendar day of the series.
fn sources_with(series: &BTreeMap<u32, i64>) -> SourceRegistry {
    let mut observations = MemoryObservationSource::new();
    observations.define_concept(Concept::new(5497, "CD4 COUNT"));
    for (&d, &value) in series {
        observations.insert("p1", "CD4 COUNT", value, day(d)).unwrap();
    }
    let mut sources = SourceRegistry::new();
    sources.register(Arc::new(observations));
    sources
}

fn rules() -> RuleRegistry {
    let mut rules = RuleRegistry::new();
    rules.register(
        "CD4 COUNT",
        Arc::new(ReferenceRule::new("observation", "CD4 COUNT")),
    );
    rules
}

fn arb_series() -> impl Strategy<Value = BTreeMap<u32, i64>> {
    prop::collection::btree_map(1u32..=28, -1_000i64..1_000, 1..10)
}

proptest! {
    #[test]
    fn first_and_last_read_the_same_history_in_opposite_orders(series in arb_series()) {
        let sources = sources_with(&series);
        let rules = rules();
        let cache = NoopCache;
        let cohort: Cohort = ["p1"].into_iter().collect();
        let context =
            LogicContext::new(&rules, &sources, &cache, cohort).with_index_date(day(31));
        let p1 = SubjectId::new("p1");
        let n = series.len();

        let earliest = context
            .eval(&p1, &Criteria::token("CD4 COUNT").first_n(n))
            .unwrap();
        let latest = context
            .eval(&p1, &Criteria::token("CD4 COUNT").last_n(n))
            .unwrap();

        let forward: Vec<Option<Decimal>> =
            earliest.iter().map(|f| f.value().as_numeric()).collect();
        let mut backward: Vec<Option<Decimal>> =
            latest.iter().map(|f| f.value().as_numeric()).collect();
        backward.reverse();
        prop_assert_eq!(forward.len(), n);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn count_matches_the_series_size(series in arb_series()) {
        let sources = sources_with(&series);
        let rules = rules();
        let cache = NoopCache;
        let cohort: Cohort = ["p1"].into_iter().collect();
        let context =
            LogicContext::new(&rules, &sources, &cache, cohort).with_index_date(day(31));

        let counted = context
            .eval(&SubjectId::new("p1"), &Criteria::token("CD4 COUNT").count())
            .unwrap();
        prop_assert_eq!(counted.to_numeric(), Some(Decimal::from(series.len())));
    }

    #[test]
    fn windows_keep_exactly_the_in_range_dates(
        series in arb_series(),
        anchor in 1u32..=28,
        width in 0i64..28,
    ) {
        let sources = sources_with(&series);
        let rules = rules();
        let cache = NoopCache;
        let cohort: Cohort = ["p1"].into_iter().collect();
        let context =
            LogicContext::new(&rules, &sources, &cache, cohort).with_index_date(day(31));

        let windowed = Criteria::token("CD4 COUNT")
            .as_of(day(anchor))
            .within(Duration::days(-width));
        let facts = context.eval(&SubjectId::new("p1"), &windowed).unwrap();

        let got: Vec<DateTime<Utc>> = facts.iter().map(|f| f.effective()).collect();
        let expected: Vec<DateTime<Utc>> = series
            .keys()
            .filter(|&&d| d <= anchor && i64::from(d) >= i64::from(anchor) - width)
            .map(|&d| day(d))
            .collect();
        prop_assert_eq!(got, expected);
    }
}
