use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET: &str = "claims-risk-leakage";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Policies written per policy-master refresh.
    pub batch_size: usize,
    /// Issuance dates fall between Jan 1 of this year and today.
    pub start_year_floor: i32,
    pub premium_min: i64,
    pub premium_max: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            start_year_floor: 2015,
            premium_min: 8_000,
            premium_max: 25_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FnolConfig {
    pub batch_size_min: usize,
    pub batch_size_max: usize,
    pub loss_year_floor: i32,
    pub claim_amount_min: i64,
    pub claim_amount_max: i64,
}

impl Default for FnolConfig {
    fn default() -> Self {
        Self {
            batch_size_min: 200,
            batch_size_max: 500,
            loss_year_floor: 2023,
            claim_amount_min: 3_000,
            claim_amount_max: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    /// Probability that an eligible FNOL converts into a claim.
    pub conversion_probability: f64,
    pub settlement_year_floor: i32,
    pub paid_min: i64,
    pub paid_max: i64,
    /// approved = paid + uniform delta in [approved_delta_min, approved_delta_max]
    pub approved_delta_min: i64,
    pub approved_delta_max: i64,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            conversion_probability: 0.7,
            settlement_year_floor: 2018,
            paid_min: 2_000,
            paid_max: 80_000,
            approved_delta_min: -2_000,
            approved_delta_max: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub bucket: String,
    pub policy: PolicyConfig,
    pub fnol: FnolConfig,
    pub claims: ClaimsConfig,
    /// Redraws allowed when a freshly drawn identifier was already issued
    /// in the same batch.
    pub id_retry_limit: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.into(),
            policy: PolicyConfig::default(),
            fnol: FnolConfig::default(),
            claims: ClaimsConfig::default(),
            id_retry_limit: 64,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing fields take their default values.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small policy master so tests stay fast. Everything else canonical.
    pub fn default_test() -> Self {
        Self {
            policy: PolicyConfig {
                batch_size: 250,
                ..PolicyConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |reason: String| Err(PipelineError::InvalidConfig { reason });

        if self.bucket.trim().is_empty() {
            return invalid("bucket must not be empty".into());
        }
        if self.policy.premium_min > self.policy.premium_max {
            return invalid(format!(
                "policy premium range {}..={} is empty",
                self.policy.premium_min, self.policy.premium_max
            ));
        }
        if self.fnol.batch_size_min > self.fnol.batch_size_max {
            return invalid(format!(
                "fnol batch size range {}..={} is empty",
                self.fnol.batch_size_min, self.fnol.batch_size_max
            ));
        }
        if self.fnol.claim_amount_min > self.fnol.claim_amount_max {
            return invalid(format!(
                "fnol claim amount range {}..={} is empty",
                self.fnol.claim_amount_min, self.fnol.claim_amount_max
            ));
        }
        let p = self.claims.conversion_probability;
        if !(0.0..=1.0).contains(&p) {
            return invalid(format!("conversion probability {p} outside [0, 1]"));
        }
        if self.claims.paid_min > self.claims.paid_max {
            return invalid(format!(
                "claims paid range {}..={} is empty",
                self.claims.paid_min, self.claims.paid_max
            ));
        }
        if self.claims.approved_delta_min > self.claims.approved_delta_max {
            return invalid(format!(
                "claims approved delta range {}..={} is empty",
                self.claims.approved_delta_min, self.claims.approved_delta_max
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.policy.batch_size, 10_000);
        assert_eq!(config.fnol.batch_size_min, 200);
        assert_eq!(config.fnol.batch_size_max, 500);
        assert!((config.claims.conversion_probability - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "claims": { "conversion_probability": 1.0 } }"#).unwrap();
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.claims.paid_max, 80_000);
        assert!((config.claims.conversion_probability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let mut config = PipelineConfig::default();
        config.claims.conversion_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn inverted_batch_range_rejected() {
        let mut config = PipelineConfig::default();
        config.fnol.batch_size_min = 600;
        assert!(config.validate().is_err());
    }
}
