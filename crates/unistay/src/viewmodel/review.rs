use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Booking, BookingId, BookingStatus, Property, Review, ReviewSubmission};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    pub feedback: Feedback,
    pub booking: Option<Booking>,
    pub property: Option<Property>,
    pub existing: Option<Review>,
    pub submitted: Option<Review>,
}

/// Rating form for a finished stay.
pub struct ReviewViewModel {
    repos: Repositories,
    state: StateHolder<ReviewState>,
}

impl ReviewViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("review", ReviewState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<ReviewState> {
        &self.state
    }

    pub async fn load(&self, session: &Session, booking_id: &BookingId) {
        let loaded = self
            .state
            .run("load", async {
                let student_id = session.require_student()?;
                let booking = self.repos.bookings.get(booking_id).await?;
                if &booking.student_id != student_id {
                    return Err(ViewError::invalid("You can only review your own stays"));
                }
                let property = self.repos.properties.get(&booking.property_id).await?;
                let existing = self.repos.reviews.for_booking(&booking.id).await?;
                Ok::<_, ViewError>((booking, property, existing))
            })
            .await;

        if let Some((booking, property, existing)) = loaded {
            self.state.update(|state| {
                *state = ReviewState {
                    booking: Some(booking),
                    property: Some(property),
                    existing,
                    ..ReviewState::default()
                };
            });
        }
    }

    pub async fn submit(
        &self,
        session: &Session,
        property_rating: u8,
        landlord_rating: u8,
        comment: &str,
    ) -> Option<Review> {
        let snapshot = self.state.snapshot();
        let review = self
            .state
            .run("submit", async {
                let student_id = session.require_student()?;
                let booking = snapshot
                    .booking
                    .as_ref()
                    .ok_or_else(|| ViewError::invalid("Choose a stay to review"))?;
                if booking.status != BookingStatus::Completed {
                    return Err(ViewError::invalid("Only completed stays can be reviewed"));
                }
                let submission = ReviewSubmission {
                    booking_id: booking.id.clone(),
                    student_id: student_id.clone(),
                    property_rating,
                    landlord_rating,
                    comment: Some(comment.to_string()),
                };
                Ok::<_, ViewError>(self.repos.reviews.submit(&submission).await?)
            })
            .await?;

        self.state.update(|state| {
            state.existing = Some(review.clone());
            state.submitted = Some(review.clone());
        });
        self.state.succeed("Thanks for your review");
        Some(review)
    }
}

screen_state!(ReviewState);
