//! Expiry expressions.
//!
//! Accepts the forms callers already use for cache lifetimes:
//!
//! - raw Unix timestamps: `1767225600`
//! - relative offsets: `+1 year`, `-1 day`, `+2 hours 30 minutes`, `3 weeks ago`
//! - anchors: `now`, `today`, `tomorrow`, `yesterday`
//! - absolute dates: `2030-01-01`, `2030-01-01 12:00:00`, RFC 3339
//!
//! An expression is resolved to an absolute instant exactly once, against
//! the caller-supplied current time.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Expression used when the caller does not give one
pub const DEFAULT_EXPIRY: &str = "+1 year";

/// Calendar or clock unit of a relative offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl TimeUnit {
    fn parse(token: &str) -> Option<Self> {
        let unit = match token {
            "sec" | "secs" | "second" | "seconds" => Self::Second,
            "min" | "mins" | "minute" | "minutes" => Self::Minute,
            "hour" | "hours" => Self::Hour,
            "day" | "days" => Self::Day,
            "week" | "weeks" => Self::Week,
            "fortnight" | "fortnights" => Self::Fortnight,
            "month" | "months" => Self::Month,
            "year" | "years" => Self::Year,
            _ => return None,
        };
        Some(unit)
    }
}

/// One signed `<amount> <unit>` term of a relative expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTerm {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl RelativeTerm {
    fn apply(self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let fixed = |secs_per_unit: i64| {
            self.amount
                .checked_mul(secs_per_unit)
                .and_then(Duration::try_seconds)
                .and_then(|d| at.checked_add_signed(d))
        };

        match self.unit {
            TimeUnit::Second => fixed(1),
            TimeUnit::Minute => fixed(60),
            TimeUnit::Hour => fixed(3_600),
            TimeUnit::Day => fixed(86_400),
            TimeUnit::Week => fixed(7 * 86_400),
            TimeUnit::Fortnight => fixed(14 * 86_400),
            TimeUnit::Month => shift_months(at, self.amount),
            TimeUnit::Year => self.amount.checked_mul(12).and_then(|m| shift_months(at, m)),
        }
    }
}

fn shift_months(at: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        at.checked_add_months(magnitude)
    } else {
        at.checked_sub_months(magnitude)
    }
}

/// Day-granular anchors, resolved to midnight UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAnchor {
    Today,
    Tomorrow,
    Yesterday,
}

/// A parsed expiry expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirySpec {
    /// Absolute Unix timestamp in seconds
    Timestamp(i64),
    /// Absolute instant
    At(DateTime<Utc>),
    /// Midnight anchor followed by optional offsets
    Anchored(DayAnchor, Vec<RelativeTerm>),
    /// Offsets from the current time; empty means "now"
    Relative(Vec<RelativeTerm>),
}

impl ExpirySpec {
    /// Resolve to an absolute instant using `now` as the anchor for
    /// relative expressions.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, DomainError> {
        match self {
            Self::Timestamp(ts) => Utc
                .timestamp_opt(*ts, 0)
                .single()
                .ok_or_else(|| DomainError::InvalidExpiry(format!("timestamp {ts} out of range"))),
            Self::At(at) => Ok(*at),
            Self::Anchored(anchor, terms) => {
                let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
                let base = match anchor {
                    DayAnchor::Today => Some(midnight),
                    DayAnchor::Tomorrow => midnight.checked_add_signed(Duration::days(1)),
                    DayAnchor::Yesterday => midnight.checked_sub_signed(Duration::days(1)),
                };
                let base = base.ok_or_else(|| overflow(self))?;
                apply_terms(base, terms).ok_or_else(|| overflow(self))
            }
            Self::Relative(terms) => apply_terms(now, terms).ok_or_else(|| overflow(self)),
        }
    }

    /// Resolve against the current wall clock
    pub fn resolve_now(&self) -> Result<DateTime<Utc>, DomainError> {
        self.resolve(Utc::now())
    }
}

fn apply_terms(base: DateTime<Utc>, terms: &[RelativeTerm]) -> Option<DateTime<Utc>> {
    terms.iter().try_fold(base, |at, term| term.apply(at))
}

fn overflow(spec: &ExpirySpec) -> DomainError {
    DomainError::InvalidExpiry(format!("{spec} overflows the supported date range"))
}

impl Default for ExpirySpec {
    fn default() -> Self {
        Self::Relative(vec![RelativeTerm {
            amount: 1,
            unit: TimeUnit::Year,
        }])
    }
}

impl From<i64> for ExpirySpec {
    fn from(ts: i64) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for ExpirySpec {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl FromStr for ExpirySpec {
    type Err = DomainError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidExpiry("empty expression".to_string()));
        }

        if let Ok(ts) = trimmed.parse::<i64>() {
            return Ok(Self::Timestamp(ts));
        }

        if let Some(at) = parse_absolute(trimmed) {
            return Ok(Self::At(at));
        }

        let lowered = trimmed.to_ascii_lowercase();
        let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

        let anchor = match tokens.first().copied() {
            Some("now") => {
                tokens.remove(0);
                None
            }
            Some("today") => Some(DayAnchor::Today),
            Some("tomorrow") => Some(DayAnchor::Tomorrow),
            Some("yesterday") => Some(DayAnchor::Yesterday),
            _ => None,
        };
        if anchor.is_some() {
            tokens.remove(0);
        }

        let terms = parse_terms(&tokens).ok_or_else(|| DomainError::InvalidExpiry(input.to_string()))?;

        Ok(match anchor {
            Some(anchor) => Self::Anchored(anchor, terms),
            None => Self::Relative(terms),
        })
    }
}

fn parse_absolute(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Parse `[+|-]N unit ...` with an optional trailing `ago` that negates
/// every term.
fn parse_terms(tokens: &[&str]) -> Option<Vec<RelativeTerm>> {
    let (tokens, negate) = match tokens.split_last() {
        Some((&"ago", rest)) if !rest.is_empty() => (rest, true),
        _ => (tokens, false),
    };

    if tokens.len() % 2 != 0 {
        return None;
    }

    tokens
        .chunks_exact(2)
        .map(|pair| {
            let amount = parse_signed(pair[0])?;
            let unit = TimeUnit::parse(pair[1])?;
            let amount = if negate { amount.checked_neg()? } else { amount };
            Some(RelativeTerm { amount, unit })
        })
        .collect()
}

fn parse_signed(token: &str) -> Option<i64> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    digits.parse().ok()
}

impl fmt::Display for ExpirySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => write!(f, "{ts}"),
            Self::At(at) => write!(f, "{}", at.to_rfc3339()),
            Self::Anchored(anchor, terms) => {
                let name = match anchor {
                    DayAnchor::Today => "today",
                    DayAnchor::Tomorrow => "tomorrow",
                    DayAnchor::Yesterday => "yesterday",
                };
                f.write_str(name)?;
                write_terms(f, terms)
            }
            Self::Relative(terms) if terms.is_empty() => f.write_str("now"),
            Self::Relative(terms) => {
                f.write_str("now")?;
                write_terms(f, terms)
            }
        }
    }
}

fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[RelativeTerm]) -> fmt::Result {
    for term in terms {
        write!(f, " {:+} {:?}", term.amount, term.unit)?;
    }
    Ok(())
}
