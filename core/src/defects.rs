//! Defect injection: deliberate, per-field formatting noise.
//!
//! Every call picks a representation uniformly and independently of every
//! other call. Two records holding the same value may serialize it
//! differently, and nothing here remembers what it chose before.

use crate::rng::StageRng;
use chrono::{Duration, NaiveDate};

/// The date menu. Order is part of the seeded stream; append only.
pub const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%y", "%m-%d-%Y", "%b %d %Y", "%Y/%m/%d"];

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The representations an amount may take after defect injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountStyle {
    /// `12345`
    Plain,
    /// `12,345`
    Grouped,
    /// `12.3k`
    Thousands,
    /// `""`
    Empty,
    /// JSON `null`
    Null,
}

impl AmountStyle {
    /// Order is part of the seeded stream; append only.
    pub const ALL: [AmountStyle; 5] = [
        AmountStyle::Plain,
        AmountStyle::Grouped,
        AmountStyle::Thousands,
        AmountStyle::Empty,
        AmountStyle::Null,
    ];

    pub fn render(self, value: i64) -> Option<String> {
        match self {
            Self::Plain => Some(value.to_string()),
            Self::Grouped => Some(group_thousands(value)),
            Self::Thousands => Some(format!("{:.1}k", value as f64 / 1000.0)),
            Self::Empty => Some(String::new()),
            Self::Null => None,
        }
    }

    /// Recover the style from a rendered value. Values below 1000 render
    /// identically as Plain and Grouped and classify as Plain.
    pub fn classify(rendered: Option<&str>) -> Self {
        match rendered {
            None => Self::Null,
            Some("") => Self::Empty,
            Some(s) if s.ends_with('k') => Self::Thousands,
            Some(s) if s.contains(',') => Self::Grouped,
            Some(_) => Self::Plain,
        }
    }
}

/// Render a date in a uniformly chosen format from DATE_FORMATS.
pub fn messy_date(rng: &mut StageRng, date: NaiveDate) -> String {
    let format = rng.pick(&DATE_FORMATS);
    date.format(format).to_string()
}

/// Render an amount in a uniformly chosen style, including the unusable
/// empty and null outcomes.
pub fn messy_amount(rng: &mut StageRng, value: i64) -> Option<String> {
    rng.pick(&AmountStyle::ALL).render(value)
}

/// Fixed-length uppercase alphanumeric token. No uniqueness guarantee.
pub fn random_token(rng: &mut StageRng, len: usize) -> String {
    (0..len).map(|_| char::from(*rng.pick(TOKEN_ALPHABET))).collect()
}

/// Uniform whole-day date between Jan 1 of `floor_year` and `today`,
/// inclusive. A floor after today collapses to today.
pub fn random_date(rng: &mut StageRng, floor_year: i32, today: NaiveDate) -> NaiveDate {
    let floor = NaiveDate::from_ymd_opt(floor_year, 1, 1).unwrap_or(today);
    let span = (today - floor).num_days();
    if span <= 0 {
        return today;
    }
    floor + Duration::days(rng.range_inclusive(0, span))
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
