//! Tests for pipeline composition and date-versioned selection.

use chrono::{Duration, NaiveDate};
use polars::df;
use polars::prelude::DataFrame;
use proptest::prelude::*;
use proptest::test_runner::{RngAlgorithm, TestRng};

use cohort_ingest::{InMemorySource, SourceKind};
use cohort_model::{Identity, SliceId};
use cohort_rules::{RuleConfig, RuleError, RulePipeline, StepContext, TemporalSelector};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn slice(y: i32, m: u32, d: u32) -> Identity {
    SliceId::new(date(y, m, d)).into()
}

/// Synthetic register extract drawn from `seed`.
fn population(seed: u64, size: usize) -> DataFrame {
    let mut bytes = [0u8; 32];
    for chunk in bytes.chunks_mut(8) {
        chunk.copy_from_slice(&seed.to_le_bytes());
    }
    let mut rng = TestRng::from_seed(RngAlgorithm::ChaCha, &bytes);
    let codes = ["UA", "UB", "UC", "UD"];

    let mut ids = Vec::with_capacity(size);
    let mut births = Vec::with_capacity(size);
    let mut claims = Vec::with_capacity(size);
    let mut lr_codes = Vec::with_capacity(size);
    for i in 0..size {
        ids.push(format!("P{i:04}"));
        let birth = date(1940, 1, 1) + Duration::days(i64::from(rng.next_u32() % 21_900));
        births.push(birth.to_string());
        let claim = date(2005, 1, 1) + Duration::days(i64::from(rng.next_u32() % 4_000));
        claims.push(claim.to_string());
        lr_codes.push(codes[(rng.next_u32() % 4) as usize]);
    }
    let register_date = vec!["2015-12-31"; size];
    df!(
        "ppsn" => ids,
        "register_date" => register_date,
        "date_of_birth" => births,
        "clm_comm_date" => claims,
        "lr_code" => lr_codes
    )
    .unwrap()
}

fn eligibility_configs() -> Vec<RuleConfig> {
    serde_json::from_str(
        r#"[
            {"rule": "live_register_population", "columns": ["date_of_birth", "clm_comm_date", "lr_code"]},
            {"rule": "age_eligible", "min_age": {"years": 25}, "max_age": {"years": 60}},
            {"rule": "claim_code_eligible", "eligible_codes": ["UA", "UB"]},
            {"rule": "claim_duration_eligible", "min_duration": {"years": 1}},
            {"rule": "eligible_population", "eligibility_criteria": {
                "age_eligible": true,
                "claim_code_eligible": true,
                "claim_duration_eligible": true
            }}
        ]"#,
    )
    .unwrap()
}

#[test]
fn pipeline_bootstraps_from_the_source() {
    let source =
        InMemorySource::new("ppsn").with_table(SourceKind::ClaimantRegister, population(7, 50));
    let pipeline = RulePipeline::from_configs(eligibility_configs()).unwrap();

    let result = pipeline
        .run(&StepContext::new(&source), Some(&slice(2016, 1, 1)), None)
        .unwrap();

    assert_eq!(pipeline.len(), 5);
    assert_eq!(result.height(), 50);
    for column in [
        "age_eligible",
        "claim_code_eligible",
        "claim_duration_eligible",
        "eligible_population",
    ] {
        assert!(result.column(column).is_ok(), "missing {column}");
    }
}

#[test]
fn pipeline_resumes_from_seed_without_touching_it() {
    let source = InMemorySource::new("ppsn");
    let seed = df!("ppsn" => ["A", "B"], "lr_code" => ["UA", "UC"]).unwrap();
    let before = seed.clone();
    let pipeline = RulePipeline::from_configs(vec![
        serde_json::from_str(r#"{"rule": "claim_code_eligible", "eligible_codes": ["UA"]}"#)
            .unwrap(),
    ])
    .unwrap();

    let result = pipeline
        .run(&StepContext::new(&source), Some(&slice(2016, 1, 1)), Some(&seed))
        .unwrap();

    assert!(seed.equals_missing(&before));
    assert_eq!(result.width(), seed.width() + 1);
}

#[test]
fn empty_pipeline_passes_seed_through() {
    let source = InMemorySource::new("ppsn");
    let seed = df!("ppsn" => ["A"]).unwrap();
    let pipeline = RulePipeline::default();

    let result = pipeline
        .run(&StepContext::new(&source), None, Some(&seed))
        .unwrap();
    assert!(result.equals_missing(&seed));

    let err = pipeline
        .run(&StepContext::new(&source), None, None)
        .unwrap_err();
    assert!(matches!(err, RuleError::EmptyPipeline));
}

#[test]
fn duplicate_subjects_are_rejected() {
    let source = InMemorySource::new("ppsn");
    let seed = df!("ppsn" => ["A", "B", "A"], "lr_code" => ["UA", "UB", "UC"]).unwrap();
    let pipeline = RulePipeline::from_configs(vec![
        serde_json::from_str(r#"{"rule": "claim_code_eligible", "eligible_codes": ["UA"]}"#)
            .unwrap(),
    ])
    .unwrap();

    let err = pipeline
        .run(&StepContext::new(&source), Some(&slice(2016, 1, 1)), Some(&seed))
        .unwrap_err();

    assert!(matches!(err, RuleError::IdentityCollision { count: 1, .. }));
}

#[test]
fn invalid_configuration_fails_to_build() {
    let configs: Vec<RuleConfig> =
        serde_json::from_str(r#"[{"rule": "eligible_population", "eligibility_criteria": {}}]"#)
            .unwrap();
    let err = RulePipeline::from_configs(configs).unwrap_err();
    assert!(matches!(
        err,
        RuleError::InvalidParameter {
            rule: "eligible_population",
            ..
        }
    ));
}

#[test]
fn selector_resolves_nearest_previous_configuration() {
    let selector = TemporalSelector::new()
        .with(date(2016, 1, 1), "P1")
        .with(date(2017, 1, 1), "P2");

    assert_eq!(selector.resolve(date(2016, 6, 1)).unwrap(), &"P1");
    assert_eq!(selector.resolve(date(2017, 6, 1)).unwrap(), &"P2");
    assert!(matches!(
        selector.resolve(date(2015, 1, 1)),
        Err(RuleError::ConfigurationResolution { date: d }) if d == date(2015, 1, 1)
    ));
}

proptest! {
    #[test]
    fn pipeline_output_is_deterministic(seed in any::<u64>(), size in 0usize..40) {
        let source = InMemorySource::new("ppsn")
            .with_table(SourceKind::ClaimantRegister, population(seed, size));
        let pipeline = RulePipeline::from_configs(eligibility_configs()).unwrap();
        let ctx = StepContext::new(&source);
        let identity = slice(2016, 1, 1);

        let first = pipeline.run(&ctx, Some(&identity), None).unwrap();
        let second = pipeline.run(&ctx, Some(&identity), None).unwrap();

        prop_assert!(first.equals_missing(&second));
        prop_assert_eq!(first.height(), size);
    }

    #[test]
    fn selector_picks_greatest_date_not_after_query(
        offsets in prop::collection::btree_set(0i64..3_650, 1..8),
        query in 0i64..4_000,
    ) {
        let base = date(2010, 1, 1);
        let selector: TemporalSelector<i64> = offsets
            .iter()
            .map(|offset| (base + Duration::days(*offset), *offset))
            .collect();

        let expected = offsets.iter().copied().filter(|offset| *offset <= query).max();
        match (selector.resolve(base + Duration::days(query)), expected) {
            (Ok(found), Some(expected)) => prop_assert_eq!(*found, expected),
            (Err(RuleError::ConfigurationResolution { .. }), None) => {}
            (other, expected) => prop_assert!(false, "got {:?}, expected {:?}", other, expected),
        }
    }
}
