//! The pipeline engine: wires stages to a store, a clock and the RNG bank.
//!
//! The engine is not an orchestrator: stages never see each other. It
//! plays the part of the storage event system, turning every committed
//! artifact that matches the claims subscription into an arrival
//! notification, and delivering notifications one invocation at a time.
//!
//! RULES:
//!   - Scheduled invocations draw from (slot, per-slot sequence number).
//!   - Triggered invocations draw from (slot, trigger key).
//!   - A failed invocation commits nothing and queues nothing.

use crate::{
    claims_generator::ClaimsStage,
    clock::InvocationClock,
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    fnol_generator::FnolStage,
    notification::{ArrivalNotification, Subscription},
    policy_generator::PolicyStage,
    rng::{RngBank, StageSlot},
    stage::{InvocationContext, PipelineStage, StageOutcome, Trigger},
    store::{
        layout::{ARTIFACT_SUFFIX, FNOL_PREFIX},
        ObjectStore, SqliteObjectStore,
    },
};
use std::collections::VecDeque;

/// Outcomes of a full policy → FNOL → claims pass.
#[derive(Debug, Clone)]
pub struct LifecycleSummary {
    pub policy: StageOutcome,
    pub fnol: Vec<StageOutcome>,
    pub claims: Vec<StageOutcome>,
}

impl LifecycleSummary {
    pub fn policy_count(&self) -> usize {
        self.policy.records()
    }

    pub fn fnol_count(&self) -> usize {
        self.fnol.iter().map(StageOutcome::records).sum()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.iter().map(StageOutcome::records).sum()
    }
}

pub struct PipelineEngine {
    pub store: Box<dyn ObjectStore>,
    pub clock: InvocationClock,
    pub config: PipelineConfig,
    rng_bank: RngBank,
    /// Scheduled invocations so far, per slot.
    sequences: [u64; 3],
    claims_subscription: Subscription,
    pending: VecDeque<ArrivalNotification>,
}

impl PipelineEngine {
    pub fn new(
        store: Box<dyn ObjectStore>,
        config: PipelineConfig,
        seed: u64,
        clock: InvocationClock,
    ) -> PipelineResult<Self> {
        config.validate()?;
        if store.bucket() != config.bucket {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "store bucket '{}' does not match configured bucket '{}'",
                    store.bucket(),
                    config.bucket
                ),
            });
        }
        Ok(Self {
            store,
            clock,
            config,
            rng_bank: RngBank::new(seed),
            sequences: [0; 3],
            claims_subscription: Subscription::new(FNOL_PREFIX, ARTIFACT_SUFFIX),
            pending: VecDeque::new(),
        })
    }

    /// In-memory store, test config, clock pinned to 2025-06-15 12:00:00.
    pub fn build_test(seed: u64) -> PipelineResult<Self> {
        Self::build_test_with(seed, PipelineConfig::default_test())
    }

    pub fn build_test_with(seed: u64, config: PipelineConfig) -> PipelineResult<Self> {
        let store = SqliteObjectStore::in_memory(&config.bucket)?;
        store.migrate()?;
        let clock = InvocationClock::at(2025, 6, 15, 12, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid test clock"))?;
        Self::new(Box::new(store), config, seed, clock)
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    /// Refresh the policy master.
    pub fn run_policy_stage(&mut self) -> PipelineResult<StageOutcome> {
        self.invoke(&PolicyStage, Trigger::Scheduled)
    }

    /// Emit one FNOL batch.
    pub fn run_fnol_stage(&mut self) -> PipelineResult<StageOutcome> {
        self.invoke(&FnolStage, Trigger::Scheduled)
    }

    /// Deliver one arrival notification to the claims stage.
    /// Redelivering a notification is allowed.
    pub fn deliver(&mut self, notification: ArrivalNotification) -> PipelineResult<StageOutcome> {
        self.invoke(&ClaimsStage, Trigger::Arrival(notification))
    }

    pub fn pending_notifications(&self) -> impl Iterator<Item = &ArrivalNotification> {
        self.pending.iter()
    }

    /// Deliver queued notifications in arrival order until the queue is
    /// empty. Stops at the first failed invocation; that notification is
    /// dropped, the rest stay queued.
    pub fn dispatch_pending(&mut self) -> PipelineResult<Vec<StageOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(notification) = self.pending.pop_front() {
            let key = notification.key.clone();
            match self.deliver(notification) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::warn!("engine: claims invocation for {key} failed: {e}");
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }

    /// Policy master, then `fnol_batches` FNOL batches, then every
    /// resulting notification.
    pub fn run_lifecycle(&mut self, fnol_batches: usize) -> PipelineResult<LifecycleSummary> {
        let policy = self.run_policy_stage()?;
        let mut fnol = Vec::with_capacity(fnol_batches);
        for _ in 0..fnol_batches {
            fnol.push(self.run_fnol_stage()?);
        }
        let claims = self.dispatch_pending()?;

        let summary = LifecycleSummary {
            policy,
            fnol,
            claims,
        };
        log::info!(
            "engine: lifecycle done: {} policies, {} FNOLs, {} claims",
            summary.policy_count(),
            summary.fnol_count(),
            summary.claim_count()
        );
        Ok(summary)
    }

    fn invoke(&mut self, stage: &dyn PipelineStage, trigger: Trigger) -> PipelineResult<StageOutcome> {
        let slot = stage.slot();
        let mut rng = match &trigger {
            Trigger::Arrival(n) => self.rng_bank.for_key(slot, &n.key),
            Trigger::Scheduled => {
                let seq = self.next_sequence(slot);
                self.rng_bank.for_invocation(slot, seq)
            }
        };

        let ctx = InvocationContext {
            store: self.store.as_ref(),
            clock: &self.clock,
            config: &self.config,
        };
        log::debug!("engine: invoking {} ({:?})", stage.name(), trigger);
        let outcome = stage.invoke(&ctx, &trigger, &mut rng)?;

        if let Some(key) = outcome.committed_key() {
            if self.claims_subscription.matches(key) {
                self.pending
                    .push_back(ArrivalNotification::new(self.store.bucket(), key));
            }
        }
        Ok(outcome)
    }

    fn next_sequence(&mut self, slot: StageSlot) -> u64 {
        let counter = &mut self.sequences[slot as usize];
        let seq = *counter;
        *counter += 1;
        seq
    }
}
