use chrono::NaiveDate;

use super::{Feedback, StateHolder, ViewError};
use crate::availability::DateRange;
use crate::domain::{Booking, BookingQuote, Property, PropertyId};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct BookingRequestState {
    pub feedback: Feedback,
    pub property: Option<Property>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub message: String,
    pub quote: Option<BookingQuote>,
    /// `None` until dates are picked.
    pub available: Option<bool>,
    pub booking: Option<Booking>,
}

pub struct BookingRequestViewModel {
    repos: Repositories,
    state: StateHolder<BookingRequestState>,
}

impl BookingRequestViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("booking_request", BookingRequestState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<BookingRequestState> {
        &self.state
    }

    pub async fn load(&self, property_id: &PropertyId) {
        let property = self
            .state
            .run("load", async {
                Ok::<_, ViewError>(self.repos.properties.get(property_id).await?)
            })
            .await;
        if let Some(property) = property {
            self.state.update(|state| {
                *state = BookingRequestState {
                    property: Some(property),
                    ..BookingRequestState::default()
                };
            });
        }
    }

    pub fn set_message(&self, message: &str) {
        let message = message.to_string();
        self.state.update(|state| state.message = message);
    }

    /// Price the stay and check it against existing bookings.
    pub async fn select_dates(&self, start: NaiveDate, end: NaiveDate) {
        self.state.update(|state| {
            state.start_date = Some(start);
            state.end_date = Some(end);
            state.quote = None;
            state.available = None;
        });
        let Some(property) = self.state.snapshot().property else {
            return;
        };

        let checked = self
            .state
            .run("select_dates", async {
                if end <= start {
                    return Err(ViewError::invalid("Check-out must be after check-in"));
                }
                let range = DateRange::new(start, end)
                    .map_err(|err| ViewError::invalid(err.to_string()))?;
                let available = self.repos.bookings.is_available(&property.id, range).await;
                Ok::<_, ViewError>((BookingQuote::new(property.price_per_month, &range), available))
            })
            .await;

        if let Some((quote, available)) = checked {
            self.state.update(|state| {
                state.quote = Some(quote);
                state.available = Some(available);
                if !available {
                    state.feedback.error_message =
                        Some("The property is already booked for those dates".to_string());
                }
            });
        }
    }

    pub async fn submit(&self, session: &Session, today: NaiveDate) -> Option<Booking> {
        let snapshot = self.state.snapshot();
        let booking = self
            .state
            .run("submit", async {
                let student_id = session.require_student()?;
                let property = snapshot
                    .property
                    .as_ref()
                    .ok_or_else(|| ViewError::invalid("Choose a property first"))?;
                let (Some(start), Some(end)) = (snapshot.start_date, snapshot.end_date) else {
                    return Err(ViewError::invalid("Choose check-in and check-out dates"));
                };
                let message = Some(snapshot.message.clone());
                let booking = self
                    .repos
                    .bookings
                    .request(property, student_id, start, end, message, today)
                    .await?;
                Ok::<_, ViewError>(booking)
            })
            .await?;

        self.state.update(|state| state.booking = Some(booking.clone()));
        self.state.succeed("Booking request sent to the landlord");
        Some(booking)
    }
}

screen_state!(BookingRequestState);
