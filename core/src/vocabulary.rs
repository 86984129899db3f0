//! Fixed enumerations the generators draw categorical fields from.
//!
//! Spellings and casing are deliberately inconsistent where the source
//! systems being emulated are inconsistent. Order matters for seeded
//! replay; append only.

// ── Policy ─────────────────────────────────────────────────────────

pub const POLICY_TYPES: &[&str] = &["Auto", "Home"];
pub const POLICY_STATUSES: &[&str] = &["ACTIVE", "Active", "LAPSED"];
pub const DEDUCTIBLES: &[Option<&str>] = &[Some("1000"), Some("2000"), None];
pub const RISK_REGIONS: &[&str] = &["NORTH", "SOUTH", "EAST", "WEST"];
pub const DISTRIBUTION_CHANNELS: &[&str] = &["Agent", "Online", "Branch"];
pub const AUTO_RENEWAL_FLAGS: &[Option<&str>] = &[Some("Y"), Some("N"), None];
pub const COVERAGE_TIERS: &[i64] = &[300_000, 500_000, 1_000_000];

// ── FNOL ───────────────────────────────────────────────────────────

pub const FNOL_LOSS_TYPES: &[&str] = &["Collision", "Fire", "Theft", "Flood"];
pub const LOSS_DESCRIPTIONS: &[&str] = &["Rear-end accident", "House fire", "Water damage"];
pub const INCIDENT_STATES: &[&str] = &["KA", "MH", "TN", "AP"];
pub const INCIDENT_CITIES: &[&str] = &["Bangalore", "Mumbai", "Chennai", "Hyderabad"];
pub const REPORTING_CHANNELS: &[&str] = &["App", "Call", "Agent"];
pub const DEVICE_TYPES: &[&str] = &["Android", "iOS", "Web"];

// ── Claims ─────────────────────────────────────────────────────────

pub const CLAIM_LOSS_TYPES: &[&str] = &["Collision", "Theft", "Fire", "Flood"];
pub const CLAIM_STATUSES: &[&str] = &["Closed", "CLOSED", "Clsd"];
pub const REOPEN_COUNTS: &[Option<&str>] = &[Some("0"), Some("1"), None];
pub const LITIGATION_FLAGS: &[&str] = &["Y", "N"];
pub const SOURCE_SYSTEMS: &[&str] = &["LEGACY_SYS", "CORE_SYS"];

/// Owned copy of an optional vocabulary entry.
pub fn owned(value: &Option<&str>) -> Option<String> {
    value.map(str::to_string)
}
