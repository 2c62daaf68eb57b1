//! Tracking identifier format.
//!
//! # Responsibility
//! - Format and parse `DTS-YYYYMMDD-NNNN` identifiers.
//! - Compute the successor of the greatest identifier issued on a day.
//!
//! # Invariants
//! - `NNNN` is a 4-digit zero-padded decimal in `1..=MAX_DAILY_SEQUENCE`.
//! - The shape never widens. Within one day, lexicographic order of the text
//!   equals numeric order of the sequence, which the allocator depends on.

use crate::model::validation::ValidationError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const TRACKING_ID_PREFIX: &str = "DTS";
pub const MAX_DAILY_SEQUENCE: u32 = 9999;

static TRACKING_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DTS-(\d{8})-(\d{4})$").expect("valid tracking id regex"));

/// Parsed tracking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingId {
    date: NaiveDate,
    sequence: u32,
}

impl TrackingId {
    pub fn new(date: NaiveDate, sequence: u32) -> Result<Self, ValidationError> {
        if !(1..=MAX_DAILY_SEQUENCE).contains(&sequence) {
            return Err(ValidationError::SequenceOutOfRange(sequence));
        }
        Ok(Self { date, sequence })
    }

    /// First identifier of a day.
    pub fn first(date: NaiveDate) -> Self {
        Self { date, sequence: 1 }
    }

    /// Next identifier on the same day, or `None` once the day is exhausted.
    pub fn next(&self) -> Option<Self> {
        if self.sequence >= MAX_DAILY_SEQUENCE {
            return None;
        }
        Some(Self {
            date: self.date,
            sequence: self.sequence + 1,
        })
    }

    /// Shared text prefix of every identifier issued on `date`, e.g.
    /// `DTS-20240115-`.
    pub fn day_prefix(date: NaiveDate) -> String {
        format!("{TRACKING_ID_PREFIX}-{}-", date.format("%Y%m%d"))
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedTrackingId(value.to_string());
        let caps = TRACKING_ID_RE.captures(value).ok_or_else(malformed)?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d").map_err(|_| malformed())?;
        let sequence: u32 = caps[2].parse().map_err(|_| malformed())?;
        Self::new(date, sequence).map_err(|_| malformed())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Display for TrackingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:04}", Self::day_prefix(self.date), self.sequence)
    }
}

impl FromStr for TrackingId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingId> for String {
    fn from(value: TrackingId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{TrackingId, MAX_DAILY_SEQUENCE};
    use crate::model::validation::ValidationError;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn formats_with_zero_padded_sequence() {
        assert_eq!(TrackingId::first(day()).to_string(), "DTS-20240115-0001");
        assert_eq!(
            TrackingId::new(day(), 42).unwrap().to_string(),
            "DTS-20240115-0042"
        );
    }

    #[test]
    fn parse_accepts_own_output() {
        let id = TrackingId::parse("DTS-20240115-0137").unwrap();
        assert_eq!(id.date(), day());
        assert_eq!(id.sequence(), 137);
    }

    #[test]
    fn parse_rejects_other_shapes() {
        for value in [
            "DTS-20240115-137",
            "DTS-20240115-00001",
            "dts-20240115-0001",
            "DTS-20241315-0001",
            "DTS-20240115-0000",
            " DTS-20240115-0001",
        ] {
            assert!(
                matches!(
                    TrackingId::parse(value),
                    Err(ValidationError::MalformedTrackingId(_))
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn next_stops_at_daily_cap() {
        let last = TrackingId::new(day(), MAX_DAILY_SEQUENCE).unwrap();
        assert!(last.next().is_none());
        let before = TrackingId::new(day(), MAX_DAILY_SEQUENCE - 1).unwrap();
        assert_eq!(before.next(), Some(last));
    }

    #[test]
    fn text_order_matches_sequence_order() {
        let low = TrackingId::new(day(), 9).unwrap().to_string();
        let high = TrackingId::new(day(), 10).unwrap().to_string();
        assert!(low < high);
    }
}
