//! Shared primitive types used across the entire pipeline.
//!
//! FNOL records and claims both carry a field called `claim_id` on the
//! wire, but they are different identifier spaces. Each space gets its own
//! type so the two can never be mixed up in code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An object-store key, e.g. `raw/fnol_events/fnol_20250615_120000.json`.
pub type ObjectKey = String;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

record_id!(
    /// Policy identifier, `POL` + 6 digits.
    PolicyId
);
record_id!(
    /// First-notice-of-loss identifier, `FNOL` + 10 hex characters.
    /// Serialized under the legacy `claim_id` field on FNOL records.
    FnolId
);
record_id!(
    /// Settled-claim identifier, `CLM` + 7 digits.
    ClaimId
);
