//! Invocation clock: the wall-clock instant a stage runs at.
//!
//! Artifact names and "today" for date generation both come from here,
//! so tests pin the clock and get reproducible keys and dates.

use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Stamp format used in artifact names: `20250615_120000`.
pub const ARTIFACT_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationClock {
    /// Read UTC wall-clock time on every call.
    System,
    /// Always report the same instant.
    Fixed(NaiveDateTime),
}

impl InvocationClock {
    pub fn fixed(now: NaiveDateTime) -> Self {
        Self::Fixed(now)
    }

    /// Fixed clock from calendar fields. Returns None for an invalid instant.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, min, sec))
            .map(Self::Fixed)
    }

    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Utc::now().naive_utc(),
            Self::Fixed(t) => *t,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn artifact_stamp(&self) -> String {
        self.now().format(ARTIFACT_STAMP_FORMAT).to_string()
    }
}
