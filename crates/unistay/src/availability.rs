//! Booking overlap checks.
//!
//! A candidate stay conflicts with an existing pending or approved booking
//! when their date ranges overlap. Ranges that only touch (one ends on the
//! day the other starts) do not conflict: check-out and check-in can share a
//! day.

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::domain::{Booking, BookingId};

/// What to do with stored bookings whose dates cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedDatePolicy {
    /// Leave the record out of the comparison.
    #[default]
    Ignore,
    /// Treat the record as occupying every date.
    Block,
}

impl MalformedDatePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(Self::Ignore),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Block => "block",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("end date {end} must not be before start date {start}")]
pub struct InvertedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvertedRange> {
        if end < start {
            return Err(InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Touching ranges do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps.
pub fn parse_booking_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Outcome of comparing a candidate range with a property's bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub candidate: DateRange,
    pub policy: MalformedDatePolicy,
    pub conflicts: Vec<BookingId>,
    pub malformed: Vec<BookingId>,
}

impl AvailabilityReport {
    pub fn is_available(&self) -> bool {
        self.conflicts.is_empty()
            && (self.policy == MalformedDatePolicy::Ignore || self.malformed.is_empty())
    }
}

/// Compare `candidate` with every active booking in `existing`.
pub fn check_availability(
    candidate: DateRange,
    existing: &[Booking],
    policy: MalformedDatePolicy,
) -> AvailabilityReport {
    let mut conflicts = Vec::new();
    let mut malformed = Vec::new();

    for booking in existing.iter().filter(|booking| booking.status.is_active()) {
        match booking.range() {
            Some(range) if candidate.overlaps(&range) => conflicts.push(booking.id.clone()),
            Some(_) => {}
            None => malformed.push(booking.id.clone()),
        }
    }

    AvailabilityReport {
        candidate,
        policy,
        conflicts,
        malformed,
    }
}
