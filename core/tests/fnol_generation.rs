//! FNOL generator tests: referential integrity, precondition handling
//! and artifact naming.

use chrono::NaiveDate;
use claims_pipeline_core::{
    config::{FnolConfig, PipelineConfig},
    engine::PipelineEngine,
    error::{PipelineError, PipelineResult},
    fnol_generator::{fetch_policy_ids, FnolGenerator},
    records::{Fnol, ZipCode},
    rng::{RngBank, StageSlot},
    stage::StageOutcome,
    store::{decode_json_lines, layout::{FNOL_PREFIX, POLICY_MASTER_KEY}, ObjectStore, SqliteObjectStore},
    types::PolicyId,
};
use std::collections::HashSet;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

fn ids(raw: &[&str]) -> Vec<PolicyId> {
    raw.iter().map(|s| PolicyId::new(*s)).collect()
}

#[test]
fn every_reference_comes_from_the_snapshot() -> PipelineResult<()> {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let snapshot = ids(&["POL100001", "POL200002", "POL300003"]);
    let allowed: HashSet<_> = snapshot.iter().cloned().collect();

    for seed in 0..20 {
        let mut rng = RngBank::new(seed).for_invocation(StageSlot::Fnol, 0);
        for fnol in generator.generate_batch(&snapshot, today(), &mut rng)? {
            let policy = fnol.policy_id.expect("policy reference present");
            assert!(allowed.contains(&policy), "{policy} not in snapshot");
        }
    }
    Ok(())
}

#[test]
fn non_empty_snapshot_never_fails_precondition() {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let snapshot = ids(&["POL123456"]);

    for seed in 0..50 {
        let mut rng = RngBank::new(seed).for_invocation(StageSlot::Fnol, 0);
        let result = generator.generate_batch(&snapshot, today(), &mut rng);
        assert!(!matches!(result, Err(PipelineError::NoPolicies)));
        assert!(result.is_ok());
    }
}

#[test]
fn empty_snapshot_is_a_precondition_failure() {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let mut rng = RngBank::new(1).for_invocation(StageSlot::Fnol, 0);

    let result = generator.generate_batch(&[], today(), &mut rng);
    assert!(matches!(result, Err(PipelineError::NoPolicies)));
}

#[test]
fn batch_size_stays_in_range_and_varies() -> PipelineResult<()> {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let snapshot = ids(&["POL111111", "POL222222"]);
    let mut sizes = HashSet::new();

    for seed in 0..30 {
        let mut rng = RngBank::new(seed).for_invocation(StageSlot::Fnol, 0);
        let n = generator.generate_batch(&snapshot, today(), &mut rng)?.len();
        assert!((200..=500).contains(&n), "batch size {n} out of range");
        sizes.insert(n);
    }
    assert!(sizes.len() > 1, "batch size should vary between invocations");
    Ok(())
}

#[test]
fn fnol_ids_are_unique_and_hex_suffixed() -> PipelineResult<()> {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let mut rng = RngBank::new(9).for_invocation(StageSlot::Fnol, 0);

    let batch = generator.generate_batch(&ids(&["POL999999"]), today(), &mut rng)?;
    let unique: HashSet<_> = batch.iter().map(|f| f.fnol_id.clone()).collect();
    assert_eq!(unique.len(), batch.len());
    for fnol in &batch {
        let suffix = fnol.fnol_id.as_str().strip_prefix("FNOL").expect("FNOL prefix");
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
    Ok(())
}

#[test]
fn zip_codes_arrive_in_all_three_shapes() -> PipelineResult<()> {
    let config = FnolConfig::default();
    let generator = FnolGenerator::new(&config, 64);
    let mut rng = RngBank::new(12).for_invocation(StageSlot::Fnol, 0);

    let zips: HashSet<String> = generator
        .generate_batch(&ids(&["POL100000"]), today(), &mut rng)?
        .into_iter()
        .map(|f| match f.incident_zip {
            ZipCode::Numeric(n) => format!("n:{n}"),
            ZipCode::Text(s) => format!("s:{s}"),
        })
        .collect();
    let expected: HashSet<String> = ["s:560001", "n:560001", "s:0560001"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(zips, expected);
    Ok(())
}

#[test]
fn stage_without_policies_writes_nothing() -> PipelineResult<()> {
    let mut engine = PipelineEngine::build_test(21)?;

    let outcome = engine.run_fnol_stage()?;
    assert!(matches!(outcome, StageOutcome::PreconditionFailed { .. }));
    assert!(engine.store.list(FNOL_PREFIX)?.is_empty());
    assert_eq!(engine.pending_notifications().count(), 0);
    Ok(())
}

#[test]
fn malformed_policy_master_degrades_to_no_policies() -> PipelineResult<()> {
    let mut engine = PipelineEngine::build_test(22)?;
    engine
        .store
        .put(POLICY_MASTER_KEY, b"{\"policy_id\":\"POL111111\"}\n{broken")?;

    assert!(fetch_policy_ids(engine.store.as_ref()).is_empty());
    let outcome = engine.run_fnol_stage()?;
    assert!(matches!(outcome, StageOutcome::PreconditionFailed { .. }));
    assert!(engine.store.list(FNOL_PREFIX)?.is_empty());
    Ok(())
}

#[test]
fn fetch_skips_rows_without_policy_id() -> PipelineResult<()> {
    let store = SqliteObjectStore::in_memory("b")?;
    store.migrate()?;
    store.put(
        POLICY_MASTER_KEY,
        b"{\"policy_id\":\"POL111111\"}\n{\"other\":1}\n{\"policy_id\":null}\n{\"policy_id\":\"POL222222\"}",
    )?;
    assert_eq!(fetch_policy_ids(&store), ids(&["POL111111", "POL222222"]));
    Ok(())
}

#[test]
fn stage_commits_timestamped_artifact_and_queues_it() -> PipelineResult<()> {
    let mut engine = PipelineEngine::build_test(23)?;
    engine.run_policy_stage()?;

    let outcome = engine.run_fnol_stage()?;
    let key = outcome.committed_key().expect("committed").to_string();
    assert_eq!(key, "raw/fnol_events/fnol_20250615_120000.json");

    let body = engine.store.get(&key)?.expect("artifact present");
    let records: Vec<Fnol> = decode_json_lines(&key, &body)?;
    assert_eq!(records.len(), outcome.records());

    let queued: Vec<_> = engine.pending_notifications().map(|n| n.key.clone()).collect();
    assert_eq!(queued, vec![key]);
    Ok(())
}

#[test]
fn same_second_invocations_get_distinct_artifacts() -> PipelineResult<()> {
    let mut engine = PipelineEngine::build_test(24)?;
    engine.run_policy_stage()?;

    let a = engine.run_fnol_stage()?;
    let b = engine.run_fnol_stage()?;
    assert_eq!(a.committed_key(), Some("raw/fnol_events/fnol_20250615_120000.json"));
    assert_eq!(b.committed_key(), Some("raw/fnol_events/fnol_20250615_120000_1.json"));
    assert_eq!(engine.store.list(FNOL_PREFIX)?.len(), 2);

    // Separate invocations draw from separate streams.
    assert_ne!(
        engine.store.get("raw/fnol_events/fnol_20250615_120000.json")?,
        engine.store.get("raw/fnol_events/fnol_20250615_120000_1.json")?
    );
    Ok(())
}

#[test]
fn references_resolve_against_committed_master() -> PipelineResult<()> {
    let mut engine = PipelineEngine::build_test_with(25, PipelineConfig::default_test())?;
    engine.run_policy_stage()?;
    let committed: HashSet<PolicyId> = fetch_policy_ids(engine.store.as_ref()).into_iter().collect();
    assert_eq!(committed.len(), 250);

    let key = engine.run_fnol_stage()?.committed_key().expect("committed").to_string();
    let body = engine.store.get(&key)?.expect("artifact present");
    for fnol in decode_json_lines::<Fnol>(&key, &body)? {
        let policy = fnol.policy_id.expect("policy reference");
        assert!(committed.contains(&policy));
    }
    Ok(())
}
