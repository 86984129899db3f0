//! Claims generator: converts one FNOL batch into settled claims.
//!
//! Runs once per arrival notification and reads only the key the
//! notification names. Each eligible FNOL gets an independent Bernoulli
//! trial; successes become claims whose `fnol_id`/`policy_id` are copied
//! verbatim from the FNOL line.
//!
//! The output key is derived from the trigger key and written with
//! create-if-absent, so a redelivered notification commits nothing new.

use crate::{
    config::ClaimsConfig,
    defects::{messy_amount, messy_date, random_date},
    error::{PipelineError, PipelineResult},
    ids::{draw_claim_id, IdIssuer},
    records::{Claim, FnolReference},
    rng::{StageRng, StageSlot},
    stage::{InvocationContext, PipelineStage, StageOutcome, Trigger},
    store::{decode_json_lines, encode_json_lines, layout::claims_key_for},
    types::{ClaimId, FnolId, PolicyId},
    vocabulary::{self as vocab, owned},
};
use chrono::NaiveDate;

/// Extract the claim-eligible `(fnol_id, policy_id)` pairs of an FNOL
/// artifact, in file order. Any unparseable line fails the whole artifact.
pub fn eligible_pairs(key: &str, body: &[u8]) -> PipelineResult<Vec<(FnolId, PolicyId)>> {
    let references: Vec<FnolReference> = decode_json_lines(key, body)?;
    let total = references.len();
    let eligible: Vec<_> = references.into_iter().filter_map(FnolReference::eligible).collect();
    if eligible.len() < total {
        log::debug!(
            "claims: {} of {total} FNOL records in {key} carry no policy and are skipped",
            total - eligible.len()
        );
    }
    Ok(eligible)
}

pub struct ClaimsGenerator<'a> {
    config: &'a ClaimsConfig,
    id_retry_limit: u32,
}

impl<'a> ClaimsGenerator<'a> {
    pub fn new(config: &'a ClaimsConfig, id_retry_limit: u32) -> Self {
        Self {
            config,
            id_retry_limit,
        }
    }

    /// One Bernoulli trial per eligible pair; at most one claim each.
    pub fn generate_batch(
        &self,
        eligible: &[(FnolId, PolicyId)],
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Vec<Claim>> {
        let mut issuer = IdIssuer::new("claim", self.id_retry_limit);
        let mut claims = Vec::new();
        for (fnol_id, policy_id) in eligible {
            if rng.chance(self.config.conversion_probability) {
                claims.push(self.generate_claim(fnol_id, policy_id, &mut issuer, today, rng)?);
            }
        }
        Ok(claims)
    }

    fn generate_claim(
        &self,
        fnol_id: &FnolId,
        policy_id: &PolicyId,
        issuer: &mut IdIssuer<ClaimId>,
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Claim> {
        let paid = rng.range_inclusive(self.config.paid_min, self.config.paid_max);
        let approved = paid
            + rng.range_inclusive(self.config.approved_delta_min, self.config.approved_delta_max);
        let settled = random_date(rng, self.config.settlement_year_floor, today);

        Ok(Claim {
            claim_id: issuer.issue(rng, draw_claim_id)?,
            fnol_id: fnol_id.clone(),
            policy_id: policy_id.clone(),
            loss_type: rng.pick(vocab::CLAIM_LOSS_TYPES).to_string(),
            claim_status: rng.pick(vocab::CLAIM_STATUSES).to_string(),
            paid_amount: messy_amount(rng, paid),
            approved_amount: messy_amount(rng, approved),
            settlement_date: messy_date(rng, settled),
            days_to_settle: rng.range_inclusive(3, 120).to_string(),
            adjuster_id: format!("ADJ{}", rng.range_inclusive(100, 999)),
            reopen_count: owned(rng.pick(vocab::REOPEN_COUNTS)),
            litigation_flag: rng.pick(vocab::LITIGATION_FLAGS).to_string(),
            source_system: rng.pick(vocab::SOURCE_SYSTEMS).to_string(),
        })
    }
}

/// Handles FNOL arrival notifications.
pub struct ClaimsStage;

impl PipelineStage for ClaimsStage {
    fn name(&self) -> &'static str {
        "claims"
    }

    fn slot(&self) -> StageSlot {
        StageSlot::Claims
    }

    fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        trigger: &Trigger,
        rng: &mut StageRng,
    ) -> PipelineResult<StageOutcome> {
        let notification = match trigger {
            Trigger::Arrival(n) => n,
            Trigger::Scheduled => {
                return Err(PipelineError::InvalidNotification {
                    reason: "claims stage runs only on an FNOL arrival".into(),
                })
            }
        };
        if notification.bucket != ctx.store.bucket() {
            return Err(PipelineError::InvalidNotification {
                reason: format!(
                    "notification for bucket '{}' delivered to store '{}'",
                    notification.bucket,
                    ctx.store.bucket()
                ),
            });
        }

        let claims_key = claims_key_for(&notification.key)?;
        if ctx.store.exists(&claims_key)? {
            log::warn!(
                "claims: {claims_key} already committed for {}, skipping redelivery",
                notification.key
            );
            return Ok(StageOutcome::AlreadyCommitted { key: claims_key });
        }

        let body = ctx
            .store
            .get(&notification.key)?
            .ok_or_else(|| PipelineError::ArtifactNotFound {
                bucket: notification.bucket.clone(),
                key: notification.key.clone(),
            })?;
        let eligible = eligible_pairs(&notification.key, &body)?;

        let generator = ClaimsGenerator::new(&ctx.config.claims, ctx.config.id_retry_limit);
        let claims = generator.generate_batch(&eligible, ctx.clock.today(), rng)?;

        let out = encode_json_lines(&claims)?;
        if !ctx.store.put_if_absent(&claims_key, &out)? {
            log::warn!("claims: lost race for {claims_key}, another invocation committed it");
            return Ok(StageOutcome::AlreadyCommitted { key: claims_key });
        }

        log::info!(
            "claims: {} claims from {} eligible FNOLs in {} -> {claims_key}",
            claims.len(),
            eligible.len(),
            notification.key
        );
        Ok(StageOutcome::Committed {
            key: claims_key,
            records: claims.len(),
        })
    }
}
