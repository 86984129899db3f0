//! Identifier formation and in-batch collision tracking.
//!
//! Identifiers are drawn from large random ranges. Within one batch the
//! IdIssuer remembers what it handed out and redraws on a repeat, so a
//! batch never contains the same identifier twice. Across batches there
//! is no coordination.

use crate::{
    error::{PipelineError, PipelineResult},
    rng::StageRng,
    types::{ClaimId, FnolId, PolicyId},
};
use std::collections::HashSet;

pub fn draw_policy_id(rng: &mut StageRng) -> PolicyId {
    PolicyId::new(format!("POL{}", rng.range_inclusive(100_000, 999_999)))
}

/// `FNOL` + the first 10 hex digits of a v4 UUID built from seeded bytes.
pub fn draw_fnol_id(rng: &mut StageRng) -> FnolId {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    let hex = uuid.simple().to_string();
    FnolId::new(format!("FNOL{}", &hex[..10]))
}

pub fn draw_claim_id(rng: &mut StageRng) -> ClaimId {
    ClaimId::new(format!("CLM{}", rng.range_inclusive(1_000_000, 9_999_999)))
}

/// Remembers identifiers issued in the current batch.
pub struct IdIssuer<T> {
    space: &'static str,
    issued: HashSet<T>,
    retry_limit: u32,
}

impl<T> IdIssuer<T>
where
    T: Clone + Eq + std::hash::Hash,
{
    pub fn new(space: &'static str, retry_limit: u32) -> Self {
        Self {
            space,
            issued: HashSet::new(),
            retry_limit,
        }
    }

    /// Draw until an unissued identifier comes up, at most
    /// `retry_limit + 1` times.
    pub fn issue<F>(&mut self, rng: &mut StageRng, mut draw: F) -> PipelineResult<T>
    where
        F: FnMut(&mut StageRng) -> T,
    {
        let attempts = self.retry_limit.saturating_add(1);
        for _ in 0..attempts {
            let id = draw(rng);
            if self.issued.insert(id.clone()) {
                return Ok(id);
            }
        }
        Err(PipelineError::IdSpaceExhausted {
            space: self.space,
            attempts,
        })
    }
}
