//! pipeline-runner: headless runner for the claims pipeline.
//!
//! Usage:
//!   pipeline-runner --seed 12345 --stage all --fnol-batches 3 --db pipeline.db
//!   pipeline-runner --stage policy --out-dir ./bucket
//!   pipeline-runner --stage fnol --out-dir ./bucket
//!   pipeline-runner --stage claims --out-dir ./bucket --trigger event.json
//!   pipeline-runner --seed 7 --at 2025-06-15T12:00:00 --out-dir ./bucket

use anyhow::{bail, Context, Result};
use claims_pipeline_core::{
    clock::InvocationClock,
    config::PipelineConfig,
    engine::PipelineEngine,
    notification::ArrivalNotification,
    stage::StageOutcome,
    store::{layout, FsObjectStore, ObjectStore, SqliteObjectStore},
};
use std::env;

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    seed: u64,
    bucket: &'a str,
    stage: &'a str,
    outcomes: &'a [StageOutcome],
    policy_artifacts: usize,
    fnol_artifacts: usize,
    claims_artifacts: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let fnol_batches = parse_arg(&args, "--fnol-batches", 1usize);
    let json_output = args.iter().any(|a| a == "--json");
    let stage = flag_value(&args, "--stage").unwrap_or("all");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let out_dir = flag_value(&args, "--out-dir");
    let trigger = flag_value(&args, "--trigger");
    let clock = match flag_value(&args, "--at") {
        Some(at) => InvocationClock::fixed(
            chrono::NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S")
                .with_context(|| format!("--at expects YYYY-MM-DDTHH:MM:SS, got {at}"))?,
        ),
        None => InvocationClock::System,
    };

    let config = match flag_value(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let store: Box<dyn ObjectStore> = match out_dir {
        Some(dir) => Box::new(FsObjectStore::open(dir, &config.bucket)?),
        None => {
            let store = SqliteObjectStore::open(db, &config.bucket)?;
            store.migrate()?;
            Box::new(store)
        }
    };

    if !json_output {
        println!("Claims pipeline: pipeline-runner");
        println!("  seed:      {seed}");
        println!("  stage:     {stage}");
        println!("  clock:     {}", clock.now().format("%Y-%m-%d %H:%M:%S"));
        println!("  bucket:    {}", config.bucket);
        match out_dir {
            Some(dir) => println!("  out_dir:   {dir}"),
            None => println!("  db:        {db}"),
        }
        println!();
    }

    let mut engine = PipelineEngine::new(store, config, seed, clock)?;
    log::info!("pipeline-runner: stage {stage}, seed {seed}");

    let outcomes = match stage {
        "policy" => vec![engine.run_policy_stage()?],
        "fnol" => {
            let mut outcomes = Vec::with_capacity(fnol_batches);
            for _ in 0..fnol_batches {
                outcomes.push(engine.run_fnol_stage()?);
            }
            outcomes
        }
        "claims" => {
            let path = trigger.context("--stage claims requires --trigger <event.json>")?;
            let event = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read trigger event {path}"))?;
            let notification = ArrivalNotification::from_event_json(&event)?;
            vec![engine.deliver(notification)?]
        }
        "all" => {
            let summary = engine.run_lifecycle(fnol_batches)?;
            let mut outcomes = vec![summary.policy];
            outcomes.extend(summary.fnol);
            outcomes.extend(summary.claims);
            outcomes
        }
        other => bail!("Unknown stage '{other}' (expected policy, fnol, claims or all)"),
    };

    let summary = RunSummary {
        seed: engine.seed(),
        bucket: engine.store.bucket(),
        stage,
        outcomes: &outcomes,
        policy_artifacts: engine.store.list(layout::POLICY_MASTER_KEY)?.len(),
        fnol_artifacts: engine.store.list(layout::FNOL_PREFIX)?.len(),
        claims_artifacts: engine.store.list(layout::CLAIMS_PREFIX)?.len(),
    };

    if json_output {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }

    let failed = outcomes
        .iter()
        .any(|o| matches!(o, StageOutcome::PreconditionFailed { .. }));
    if failed {
        std::process::exit(2);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary<'_>) {
    println!("=== RUN SUMMARY ===");
    for outcome in summary.outcomes {
        match outcome {
            StageOutcome::Committed { key, records } => {
                println!("  committed   {records:>6} records  {key}");
            }
            StageOutcome::AlreadyCommitted { key } => {
                println!("  duplicate                   {key}");
            }
            StageOutcome::PreconditionFailed { reason } => {
                println!("  precondition failed: {reason}");
            }
        }
    }
    println!();
    println!("=== BUCKET: {} ===", summary.bucket);
    println!("  policy master:   {}", summary.policy_artifacts);
    println!("  fnol batches:    {}", summary.fnol_artifacts);
    println!("  claims batches:  {}", summary.claims_artifacts);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
