//! Stage trait and invocation plumbing.
//!
//! RULE: Every generator stage implements PipelineStage.
//! A stage invocation is stateless: it reads what it needs from the store,
//! commits at most one artifact, and reports what happened.

use crate::{
    clock::InvocationClock,
    config::PipelineConfig,
    error::PipelineResult,
    notification::ArrivalNotification,
    rng::{StageRng, StageSlot},
    store::ObjectStore,
    types::ObjectKey,
};
use serde::Serialize;

/// Everything an invocation may touch besides its RNG.
pub struct InvocationContext<'a> {
    pub store: &'a dyn ObjectStore,
    pub clock: &'a InvocationClock,
    pub config: &'a PipelineConfig,
}

/// Why a stage is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Invoked on demand or on a schedule.
    Scheduled,
    /// Invoked for exactly one newly committed object.
    Arrival(ArrivalNotification),
}

/// The result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// One artifact was written.
    Committed { key: ObjectKey, records: usize },
    /// A precondition did not hold; nothing was written.
    PreconditionFailed { reason: String },
    /// The artifact this invocation would write already exists.
    AlreadyCommitted { key: ObjectKey },
}

impl StageOutcome {
    pub fn committed_key(&self) -> Option<&str> {
        match self {
            Self::Committed { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn records(&self) -> usize {
        match self {
            Self::Committed { records, .. } => *records,
            _ => 0,
        }
    }
}

/// The contract every stage must fulfill.
pub trait PipelineStage {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// RNG slot this stage draws from.
    fn slot(&self) -> StageSlot;

    /// Run once.
    ///
    /// - `ctx`:     store, clock and configuration
    /// - `trigger`: why the stage is running
    /// - `rng`:     this invocation's deterministic RNG
    ///
    /// Errors mean the invocation failed and nothing was committed.
    fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        trigger: &Trigger,
        rng: &mut StageRng,
    ) -> PipelineResult<StageOutcome>;
}
