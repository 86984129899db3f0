//! Artifact key layout in the bucket.
//!
//!   raw/policy_master/policy_master.json       single, overwritten
//!   raw/fnol_events/fnol_<stamp>.json          one per FNOL invocation
//!   raw/claims_history/claims_<stamp>.json     one per triggering FNOL artifact,
//!                                              mirroring any subdirectory

use crate::{
    error::{PipelineError, PipelineResult},
    types::ObjectKey,
};

pub const POLICY_MASTER_KEY: &str = "raw/policy_master/policy_master.json";
pub const FNOL_PREFIX: &str = "raw/fnol_events/";
pub const CLAIMS_PREFIX: &str = "raw/claims_history/";
pub const ARTIFACT_SUFFIX: &str = ".json";

/// FNOL artifact key for a stamp. `attempt > 0` disambiguates two
/// invocations landing in the same second.
pub fn fnol_key(stamp: &str, attempt: u32) -> ObjectKey {
    if attempt == 0 {
        format!("{FNOL_PREFIX}fnol_{stamp}{ARTIFACT_SUFFIX}")
    } else {
        format!("{FNOL_PREFIX}fnol_{stamp}_{attempt}{ARTIFACT_SUFFIX}")
    }
}

/// Claims artifact key for the FNOL artifact that triggered it.
///
/// `raw/fnol_events/<dir>/fnol_<stamp>.json` maps to
/// `raw/claims_history/<dir>/claims_<stamp>.json`. The path under the FNOL
/// prefix is kept verbatim, so distinct triggers never share a claims
/// artifact, and redelivery of one trigger always targets the same one.
/// Keys outside that shape are rejected.
pub fn claims_key_for(fnol_key: &str) -> PipelineResult<ObjectKey> {
    let invalid = |reason: &str| PipelineError::InvalidNotification {
        reason: format!("{fnol_key}: {reason}"),
    };
    let rel = fnol_key
        .strip_prefix(FNOL_PREFIX)
        .ok_or_else(|| invalid("not under raw/fnol_events/"))?;
    if !rel.ends_with(ARTIFACT_SUFFIX) {
        return Err(invalid("not a .json artifact"));
    }
    let (dir, file) = match rel.rfind('/') {
        Some(i) => rel.split_at(i + 1),
        None => ("", rel),
    };
    let stamp = file
        .strip_prefix("fnol_")
        .ok_or_else(|| invalid("file name does not start with fnol_"))?;
    Ok(format!("{CLAIMS_PREFIX}{dir}claims_{stamp}"))
}
