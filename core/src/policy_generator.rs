//! Policy generator: the leaf of the pipeline.
//!
//! Produces the whole policy master in one batch and overwrites
//! `raw/policy_master/policy_master.json` with it.

use crate::{
    config::PolicyConfig,
    defects::{messy_amount, messy_date, random_date, random_token},
    error::PipelineResult,
    ids::{draw_policy_id, IdIssuer},
    records::Policy,
    rng::{StageRng, StageSlot},
    stage::{InvocationContext, PipelineStage, StageOutcome, Trigger},
    store::{encode_json_lines, layout::POLICY_MASTER_KEY},
    types::PolicyId,
    vocabulary::{self as vocab, owned},
};
use chrono::{Duration, NaiveDate};

/// Policy terms run a whole number of 365-day years.
pub const MIN_TERM_YEARS: i64 = 1;
pub const MAX_TERM_YEARS: i64 = 5;

pub struct PolicyGenerator<'a> {
    config: &'a PolicyConfig,
    id_retry_limit: u32,
}

impl<'a> PolicyGenerator<'a> {
    pub fn new(config: &'a PolicyConfig, id_retry_limit: u32) -> Self {
        Self {
            config,
            id_retry_limit,
        }
    }

    /// Generate exactly `count` policies as of `today`.
    pub fn generate_batch(
        &self,
        count: usize,
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Vec<Policy>> {
        let mut issuer = IdIssuer::new("policy", self.id_retry_limit);
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            batch.push(self.generate_policy(&mut issuer, today, rng)?);
        }
        Ok(batch)
    }

    fn generate_policy(
        &self,
        issuer: &mut IdIssuer<PolicyId>,
        today: NaiveDate,
        rng: &mut StageRng,
    ) -> PipelineResult<Policy> {
        let policy_id = issuer.issue(rng, draw_policy_id)?;
        let (start, end) = draw_term(rng, self.config.start_year_floor, today);
        let coverage = *rng.pick(vocab::COVERAGE_TIERS);
        let premium = rng.range_inclusive(self.config.premium_min, self.config.premium_max);

        Ok(Policy {
            policy_id,
            policy_type: rng.pick(vocab::POLICY_TYPES).to_string(),
            policy_status: rng.pick(vocab::POLICY_STATUSES).to_string(),
            policy_start_date: messy_date(rng, start),
            policy_end_date: messy_date(rng, end),
            // Tenure is drawn on its own and need not agree with the term.
            policy_tenure_years: rng
                .range_inclusive(MIN_TERM_YEARS, MAX_TERM_YEARS)
                .to_string(),
            coverage_limit: render_coverage(rng, coverage),
            deductible: owned(rng.pick(vocab::DEDUCTIBLES)),
            premium_amount: messy_amount(rng, premium),
            risk_region: rng.pick(vocab::RISK_REGIONS).to_string(),
            underwriter_id: format!("UW{}", rng.range_inclusive(10, 99)),
            product_code: random_token(rng, 6),
            distribution_channel: rng.pick(vocab::DISTRIBUTION_CHANNELS).to_string(),
            auto_renewal_flag: owned(rng.pick(vocab::AUTO_RENEWAL_FLAGS)),
        })
    }
}

/// Issuance date in [Jan 1 floor_year, today] and an end date 1–5 whole
/// years of 365 days later. The end is always strictly after the start.
pub fn draw_term(rng: &mut StageRng, floor_year: i32, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = random_date(rng, floor_year, today);
    let years = rng.range_inclusive(MIN_TERM_YEARS, MAX_TERM_YEARS);
    (start, start + Duration::days(365 * years))
}

/// Plain, `K` (thousands) or `L` (lakhs), chosen independently of the tier.
fn render_coverage(rng: &mut StageRng, coverage: i64) -> String {
    match rng.next_u64_below(3) {
        0 => coverage.to_string(),
        1 => format!("{}K", coverage / 1_000),
        _ => format!("{}L", coverage / 100_000),
    }
}

/// Refreshes the policy master.
pub struct PolicyStage;

impl PipelineStage for PolicyStage {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn slot(&self) -> StageSlot {
        StageSlot::Policy
    }

    fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        _trigger: &Trigger,
        rng: &mut StageRng,
    ) -> PipelineResult<StageOutcome> {
        let generator = PolicyGenerator::new(&ctx.config.policy, ctx.config.id_retry_limit);
        let policies =
            generator.generate_batch(ctx.config.policy.batch_size, ctx.clock.today(), rng)?;

        let body = encode_json_lines(&policies)?;
        ctx.store.put(POLICY_MASTER_KEY, &body)?;

        log::info!(
            "policy: wrote {} policies to {}/{POLICY_MASTER_KEY}",
            policies.len(),
            ctx.store.bucket()
        );
        Ok(StageOutcome::Committed {
            key: POLICY_MASTER_KEY.to_string(),
            records: policies.len(),
        })
    }
}
