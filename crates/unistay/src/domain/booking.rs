use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::ids::{BookingId, PropertyId, StudentId};
use crate::availability::{parse_booking_date, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Pending,
            Self::Approved,
            Self::Rejected,
            Self::Cancelled,
            Self::Completed,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    /// Statuses that hold the property's dates.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Cancelled)
                | (Self::Approved, Self::Completed)
                | (Self::Approved, Self::Cancelled)
        )
    }
}

/// Stored dates are kept as text so malformed history can be reported
/// instead of failing the whole read.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub property_id: PropertyId,
    pub student_id: StudentId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub start_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub end_date: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// `None` when either stored date is malformed.
    pub fn range(&self) -> Option<DateRange> {
        let start = parse_booking_date(&self.start_date)?;
        let end = parse_booking_date(&self.end_date)?;
        DateRange::new(start, end).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub property_id: PropertyId,
    pub student_id: StudentId,
    pub start_date: String,
    pub end_date: String,
    pub status: BookingStatus,
    pub total_price: f64,
    pub message: Option<String>,
}

/// Price of a stay: the monthly rent prorated over 30-day months, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookingQuote {
    pub nights: i64,
    pub price_per_month: f64,
    pub total_price: f64,
}

impl BookingQuote {
    pub fn new(price_per_month: f64, range: &DateRange) -> Self {
        let nights = range.nights();
        let raw = price_per_month * nights as f64 / 30.0;
        Self {
            nights,
            price_per_month,
            total_price: (raw * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn only_forward_transitions_are_allowed() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Rejected.can_transition_to(Approved));
        for status in BookingStatus::ordered() {
            if status.is_terminal() {
                assert!(BookingStatus::ordered()
                    .iter()
                    .all(|next| !status.can_transition_to(*next)));
            }
        }
    }

    #[test]
    fn malformed_dates_decode_but_have_no_range() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "bkg-000001",
            "property_id": "prop-000001",
            "student_id": "stu-000001",
            "start_date": "2025-13-40",
            "end_date": null,
            "status": "pending",
        }))
        .expect("row decodes");
        assert_eq!(booking.end_date, "");
        assert!(booking.range().is_none());
    }

    #[test]
    fn quote_prorates_monthly_rent() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid");
        let end = NaiveDate::from_ymd_opt(2025, 9, 16).expect("valid");
        let range = DateRange::new(start, end).expect("ordered range");
        let quote = BookingQuote::new(600.0, &range);
        assert_eq!(quote.nights, 15);
        assert_eq!(quote.total_price, 300.0);
    }
}
