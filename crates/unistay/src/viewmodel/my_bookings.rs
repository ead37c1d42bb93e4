use std::collections::HashSet;

use serde::Serialize;

use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Booking, BookingId, BookingStatus, PropertyId};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentBookingEntry {
    pub booking: Booking,
    pub property_title: String,
    pub can_cancel: bool,
    pub can_review: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StudentBookingsState {
    pub feedback: Feedback,
    pub entries: Vec<StudentBookingEntry>,
}

/// A student's booking history with cancel and review affordances.
pub struct StudentBookingsViewModel {
    repos: Repositories,
    state: StateHolder<StudentBookingsState>,
}

impl StudentBookingsViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("my_bookings", StudentBookingsState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<StudentBookingsState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        let entries = self
            .state
            .run("load", self.entries(session))
            .await;
        if let Some(entries) = entries {
            self.state.update(|state| state.entries = entries);
        }
    }

    async fn entries(&self, session: &Session) -> Result<Vec<StudentBookingEntry>, ViewError> {
        let student_id = session.require_student()?;
        let bookings = self.repos.bookings.for_student(student_id).await?;

        let property_ids: Vec<PropertyId> = bookings
            .iter()
            .map(|booking| booking.property_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let properties = self.repos.properties.list_by_ids(&property_ids).await?;
        let reviewed: HashSet<BookingId> = self
            .repos
            .reviews
            .for_student(student_id)
            .await?
            .into_iter()
            .map(|review| review.booking_id)
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let property_title = properties
                    .iter()
                    .find(|property| property.id == booking.property_id)
                    .map(|property| property.title.clone())
                    .unwrap_or_else(|| "Listing removed".to_string());
                StudentBookingEntry {
                    can_cancel: booking.status.can_transition_to(BookingStatus::Cancelled),
                    can_review: booking.status == BookingStatus::Completed
                        && !reviewed.contains(&booking.id),
                    property_title,
                    booking,
                }
            })
            .collect())
    }

    pub async fn cancel(&self, session: &Session, booking_id: &BookingId) {
        let cancelled = self
            .state
            .run("cancel", async {
                let student_id = session.require_student()?;
                self.repos
                    .bookings
                    .cancel_for_student(student_id, booking_id)
                    .await?;
                self.entries(session).await
            })
            .await;

        if let Some(entries) = cancelled {
            self.state.update(|state| state.entries = entries);
            self.state.succeed("Booking cancelled");
        }
    }
}

screen_state!(StudentBookingsState);
