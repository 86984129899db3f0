//! Wire records for the three raw streams.
//!
//! Field order matches the column order downstream loaders expect;
//! serde serializes struct fields in declaration order. Absent values
//! serialize as JSON `null`, never as a missing key.

use crate::types::{ClaimId, FnolId, PolicyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: PolicyId,
    pub policy_type: String,
    pub policy_status: String,
    pub policy_start_date: String,
    pub policy_end_date: String,
    pub policy_tenure_years: String,
    pub coverage_limit: String,
    pub deductible: Option<String>,
    pub premium_amount: Option<String>,
    pub risk_region: String,
    pub underwriter_id: String,
    pub product_code: String,
    pub distribution_channel: String,
    pub auto_renewal_flag: Option<String>,
}

/// A zip code as the reporting systems send it: sometimes a string,
/// sometimes a bare number, sometimes zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZipCode {
    Numeric(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fnol {
    #[serde(rename = "claim_id")]
    pub fnol_id: FnolId,
    pub policy_id: Option<PolicyId>,
    pub policy_number_legacy: String,
    pub loss_type: String,
    pub loss_description: String,
    pub loss_date: String,
    pub reported_date: String,
    pub claim_amount: Option<String>,
    pub incident_state: String,
    pub incident_city: String,
    pub incident_zip: ZipCode,
    pub reporting_channel: String,
    pub agent_id: Option<String>,
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub fnol_id: FnolId,
    pub policy_id: PolicyId,
    pub loss_type: String,
    pub claim_status: String,
    pub paid_amount: Option<String>,
    pub approved_amount: Option<String>,
    pub settlement_date: String,
    pub days_to_settle: String,
    pub adjuster_id: String,
    pub reopen_count: Option<String>,
    pub litigation_flag: String,
    pub source_system: String,
}

/// The slice of an FNOL line the claims stage needs. Deliberately lenient:
/// every other field may be missing or oddly typed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FnolReference {
    #[serde(rename = "claim_id")]
    pub fnol_id: FnolId,
    #[serde(default)]
    pub policy_id: Option<PolicyId>,
}

impl FnolReference {
    /// Only FNOLs carrying a non-empty policy reference can become claims.
    pub fn eligible(self) -> Option<(FnolId, PolicyId)> {
        match self.policy_id {
            Some(p) if !p.as_str().is_empty() => Some((self.fnol_id, p)),
            _ => None,
        }
    }
}

/// The slice of a policy-master line the FNOL stage needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyReference {
    #[serde(default)]
    pub policy_id: Option<PolicyId>,
}
