use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, warn};

use super::{fetch_all, fetch_one, update_one, RepositoryError};
use crate::availability::{check_availability, AvailabilityReport, DateRange, MalformedDatePolicy};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{
    Booking, BookingId, BookingQuote, BookingStatus, NewBooking, Property, PropertyId, StudentId,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct BookingRepository {
    service: SharedDataService,
    policy: MalformedDatePolicy,
}

impl BookingRepository {
    pub fn new(service: SharedDataService, policy: MalformedDatePolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> MalformedDatePolicy {
        self.policy
    }

    /// Pending and approved bookings, the ones that hold dates.
    pub async fn active_for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let active = BookingStatus::ordered()
            .into_iter()
            .filter(|status| status.is_active())
            .map(BookingStatus::as_str);
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Bookings)
                .filter(Filter::eq("property_id", property_id))
                .filter(Filter::is_in("status", active)),
        )
        .await
    }

    pub async fn availability(
        &self,
        property_id: &PropertyId,
        range: DateRange,
    ) -> Result<AvailabilityReport, RepositoryError> {
        let existing = self.active_for_property(property_id).await?;
        let report = check_availability(range, &existing, self.policy);
        if !report.malformed.is_empty() {
            warn!(
                property_id = %property_id,
                malformed = report.malformed.len(),
                policy = self.policy.label(),
                "bookings with unparseable dates"
            );
        }
        Ok(report)
    }

    /// A failed lookup counts as unavailable.
    pub async fn is_available(&self, property_id: &PropertyId, range: DateRange) -> bool {
        match self.availability(property_id, range).await {
            Ok(report) => report.is_available(),
            Err(err) => {
                warn!(error = %err, property_id = %property_id, "availability check failed");
                false
            }
        }
    }

    /// Check, insert as pending, then read the stored row back.
    pub async fn request(
        &self,
        property: &Property,
        student_id: &StudentId,
        start: NaiveDate,
        end: NaiveDate,
        message: Option<String>,
        today: NaiveDate,
    ) -> Result<Booking, RepositoryError> {
        if end <= start {
            return Err(RepositoryError::Validation(
                "Check-out must be after check-in".to_string(),
            ));
        }
        if start < today {
            return Err(RepositoryError::Validation(
                "Check-in cannot be in the past".to_string(),
            ));
        }
        if !property.is_active {
            return Err(RepositoryError::Validation(
                "This property is not accepting bookings".to_string(),
            ));
        }
        if !property.window_contains(start, end) {
            return Err(RepositoryError::Validation(
                "Those dates are outside the property's availability".to_string(),
            ));
        }

        let range = DateRange::new(start, end)
            .map_err(|err| RepositoryError::Validation(err.to_string()))?;
        let report = self.availability(&property.id, range).await?;
        if !report.is_available() {
            return Err(RepositoryError::Conflict(
                "The property is already booked for those dates".to_string(),
            ));
        }

        let quote = BookingQuote::new(property.price_per_month, &range);
        let booking = NewBooking {
            property_id: property.id.clone(),
            student_id: student_id.clone(),
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            status: BookingStatus::Pending,
            total_price: quote.total_price,
            message: message
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
        };
        let inserted: Booking =
            decode_row(self.service.insert(Table::Bookings, encode_row(&booking)?).await?)?;

        let confirmed = self.get(&inserted.id).await?;
        info!(
            booking_id = %confirmed.id,
            property_id = %property.id,
            nights = quote.nights,
            "booking requested"
        );
        Ok(confirmed)
    }

    pub async fn get(&self, id: &BookingId) -> Result<Booking, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Bookings).filter(Filter::eq("id", id)),
        )
        .await
    }

    pub async fn for_student(&self, student_id: &StudentId) -> Result<Vec<Booking>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Bookings)
                .filter(Filter::eq("student_id", student_id))
                .order_by("created_at", true),
        )
        .await
    }

    pub async fn for_properties(
        &self,
        property_ids: &[PropertyId],
    ) -> Result<Vec<Booking>, RepositoryError> {
        if property_ids.is_empty() {
            return Ok(Vec::new());
        }
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Bookings)
                .filter(Filter::is_in("property_id", property_ids))
                .order_by("created_at", true),
        )
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Bookings).order_by("created_at", true),
        )
        .await
    }

    /// Move a booking along its lifecycle; backwards moves are refused.
    pub async fn update_status(
        &self,
        id: &BookingId,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::Validation(format!(
                "A {} booking cannot become {}",
                current.status.as_str(),
                next.as_str()
            )));
        }
        let booking: Booking = update_one(
            self.service.as_ref(),
            Table::Bookings,
            Filter::eq("id", id),
            &json!({ "status": next }),
        )
        .await?;
        info!(
            booking_id = %id,
            from = current.status.as_str(),
            to = next.as_str(),
            "booking status changed"
        );
        Ok(booking)
    }

    /// Cancel on behalf of the student who made the request.
    pub async fn cancel_for_student(
        &self,
        student_id: &StudentId,
        id: &BookingId,
    ) -> Result<Booking, RepositoryError> {
        let booking = self.get(id).await?;
        if &booking.student_id != student_id {
            return Err(RepositoryError::NotFound { entity: "bookings" });
        }
        self.update_status(id, BookingStatus::Cancelled).await
    }
}
