//! FNOL generator: loss notifications against committed policies.
//!
//! Reads the policy master once at the start of an invocation and never
//! refreshes it. Every emitted `policy_id` comes from that snapshot.

use crate::{
    config::FnolConfig,
    defects::{messy_amount, messy_date, random_date, random_token},
    error::{PipelineError, PipelineResult},
    ids::{draw_fnol_id, IdIssuer},
    records::{Fnol, PolicyReference, ZipCode},
    rng::{StageRng, StageSlot},
    stage::{InvocationContext, PipelineStage, StageOutcome, Trigger},
    store::{
        decode_json_lines, encode_json_lines,
        layout::{fnol_key, POLICY_MASTER_KEY},
        ObjectStore,
    },
    types::{FnolId, PolicyId},
    vocabulary as vocab,
};
use chrono::NaiveDate;

/// How many `_<n>` suffixes to try when another invocation already holds
/// this second's artifact name.
pub const MAX_KEY_ATTEMPTS: u32 = 16;

pub struct FnolGenerator<'a> {
    config: &'a FnolConfig,
    id_retry_limit: u32,
}

impl<'a> FnolGenerator<'a> {
    pub fn new(config: &'a FnolConfig, id_retry_limit: u32) -> Self {
        Self {
            config,
            id_retry_limit,
        }
    }

    /// Generate one batch against the given policy snapshot.
    ///
    /// An empty snapshot is a precondition failure (`NoPolicies`), not a
    /// zero-record batch. The batch size is drawn once per call.
    pub fn generate_batch(
        &self,
        policy_ids: &[PolicyId],
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Vec<Fnol>> {
        if policy_ids.is_empty() {
            return Err(PipelineError::NoPolicies);
        }
        let size = rng.range_inclusive(
            self.config.batch_size_min as i64,
            self.config.batch_size_max as i64,
        ) as usize;

        let mut issuer = IdIssuer::new("fnol", self.id_retry_limit);
        let mut batch = Vec::with_capacity(size);
        for _ in 0..size {
            batch.push(self.generate_fnol(policy_ids, &mut issuer, today, rng)?);
        }
        Ok(batch)
    }

    fn generate_fnol(
        &self,
        policy_ids: &[PolicyId],
        issuer: &mut IdIssuer<FnolId>,
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Fnol> {
        let loss_date = random_date(rng, self.config.loss_year_floor, today);
        let amount = rng.range_inclusive(self.config.claim_amount_min, self.config.claim_amount_max);
        let fnol_id = issuer.issue(rng, draw_fnol_id)?;

        Ok(Fnol {
            fnol_id,
            policy_id: Some(rng.pick(policy_ids).clone()),
            policy_number_legacy: random_token(rng, 6),
            loss_type: rng.pick(vocab::FNOL_LOSS_TYPES).to_string(),
            loss_description: rng.pick(vocab::LOSS_DESCRIPTIONS).to_string(),
            loss_date: messy_date(rng, loss_date),
            reported_date: messy_date(rng, today),
            claim_amount: messy_amount(rng, amount),
            incident_state: rng.pick(vocab::INCIDENT_STATES).to_string(),
            incident_city: rng.pick(vocab::INCIDENT_CITIES).to_string(),
            incident_zip: draw_zip(rng),
            reporting_channel: rng.pick(vocab::REPORTING_CHANNELS).to_string(),
            agent_id: if rng.chance(0.5) {
                Some(format!("AG{}", rng.range_inclusive(10, 99)))
            } else {
                None
            },
            device_type: rng.pick(vocab::DEVICE_TYPES).to_string(),
        })
    }
}

/// Same zip, three encodings.
fn draw_zip(rng: &mut StageRng) -> ZipCode {
    match rng.next_u64_below(3) {
        0 => ZipCode::Text("560001".into()),
        1 => ZipCode::Numeric(560_001),
        _ => ZipCode::Text("0560001".into()),
    }
}

/// Best-effort snapshot of committed policy identifiers.
///
/// Any failure (store unreachable, missing or malformed policy master)
/// is logged and degrades to an empty snapshot.
pub fn fetch_policy_ids(store: &dyn ObjectStore) -> Vec<PolicyId> {
    let body = match store.get(POLICY_MASTER_KEY) {
        Ok(Some(body)) => body,
        Ok(None) => {
            log::warn!("fnol: {POLICY_MASTER_KEY} not found in {}", store.bucket());
            return Vec::new();
        }
        Err(e) => {
            log::warn!("fnol: error fetching policies: {e}");
            return Vec::new();
        }
    };
    match decode_json_lines::<PolicyReference>(POLICY_MASTER_KEY, &body) {
        Ok(rows) => rows.into_iter().filter_map(|r| r.policy_id).collect(),
        Err(e) => {
            log::warn!("fnol: error fetching policies: {e}");
            Vec::new()
        }
    }
}

/// Emits one FNOL batch per invocation.
pub struct FnolStage;

impl PipelineStage for FnolStage {
    fn name(&self) -> &'static str {
        "fnol"
    }

    fn slot(&self) -> StageSlot {
        StageSlot::Fnol
    }

    fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        _trigger: &Trigger,
        rng: &mut StageRng,
    ) -> PipelineResult<StageOutcome> {
        let policy_ids = fetch_policy_ids(ctx.store);
        log::info!("fnol: policies fetched: {}", policy_ids.len());

        let generator = FnolGenerator::new(&ctx.config.fnol, ctx.config.id_retry_limit);
        let records = match generator.generate_batch(&policy_ids, ctx.clock.today(), rng) {
            Ok(records) => records,
            Err(PipelineError::NoPolicies) => {
                log::warn!("fnol: no policies found, nothing written");
                return Ok(StageOutcome::PreconditionFailed {
                    reason: PipelineError::NoPolicies.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let body = encode_json_lines(&records)?;
        let stamp = ctx.clock.artifact_stamp();
        for attempt in 0..MAX_KEY_ATTEMPTS {
            let key = fnol_key(&stamp, attempt);
            if ctx.store.put_if_absent(&key, &body)? {
                log::info!("fnol: generated {} FNOL events -> {key}", records.len());
                return Ok(StageOutcome::Committed {
                    key,
                    records: records.len(),
                });
            }
            log::debug!("fnol: {key} already taken, trying next suffix");
        }
        Err(anyhow::anyhow!(
            "no free FNOL artifact name for stamp {stamp} after {MAX_KEY_ATTEMPTS} attempts"
        )
        .into())
    }
}
