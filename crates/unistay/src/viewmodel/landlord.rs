use serde::Serialize;

use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Booking, BookingId, BookingStatus, Property, PropertyId};
use crate::repository::Repositories;
use crate::session::Session;

/// A booking on one of the landlord's listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingRequest {
    pub booking: Booking,
    pub property_title: String,
}

#[derive(Debug, Clone, Default)]
pub struct LandlordDashboardState {
    pub feedback: Feedback,
    pub properties: Vec<Property>,
    pub requests: Vec<IncomingRequest>,
    pub pending_count: usize,
}

pub struct LandlordDashboardViewModel {
    repos: Repositories,
    state: StateHolder<LandlordDashboardState>,
}

impl LandlordDashboardViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("landlord_dashboard", LandlordDashboardState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<LandlordDashboardState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        if let Some((properties, requests)) = self.state.run("load", self.fetch(session)).await {
            self.publish(properties, requests);
        }
    }

    async fn fetch(
        &self,
        session: &Session,
    ) -> Result<(Vec<Property>, Vec<IncomingRequest>), ViewError> {
        let landlord_id = session.require_landlord()?;
        let properties = self.repos.properties.list_by_landlord(landlord_id).await?;
        let ids: Vec<PropertyId> = properties.iter().map(|property| property.id.clone()).collect();
        let requests = self
            .repos
            .bookings
            .for_properties(&ids)
            .await?
            .into_iter()
            .map(|booking| {
                let property_title = properties
                    .iter()
                    .find(|property| property.id == booking.property_id)
                    .map(|property| property.title.clone())
                    .unwrap_or_default();
                IncomingRequest {
                    booking,
                    property_title,
                }
            })
            .collect();
        Ok((properties, requests))
    }

    fn publish(&self, properties: Vec<Property>, requests: Vec<IncomingRequest>) {
        self.state.update(|state| {
            state.pending_count = requests
                .iter()
                .filter(|request| request.booking.status == BookingStatus::Pending)
                .count();
            state.properties = properties;
            state.requests = requests;
        });
    }

    pub async fn approve(&self, session: &Session, booking_id: &BookingId) {
        self.respond(session, booking_id, BookingStatus::Approved, "Booking approved")
            .await;
    }

    pub async fn reject(&self, session: &Session, booking_id: &BookingId) {
        self.respond(session, booking_id, BookingStatus::Rejected, "Booking rejected")
            .await;
    }

    /// Close out a stay that has ended.
    pub async fn complete(&self, session: &Session, booking_id: &BookingId) {
        self.respond(session, booking_id, BookingStatus::Completed, "Stay marked as completed")
            .await;
    }

    async fn respond(
        &self,
        session: &Session,
        booking_id: &BookingId,
        next: BookingStatus,
        success: &'static str,
    ) {
        let refreshed = self
            .state
            .run(next.as_str(), async {
                let landlord_id = session.require_landlord()?;
                let booking = self.repos.bookings.get(booking_id).await?;
                let property = self.repos.properties.get(&booking.property_id).await?;
                if &property.landlord_id != landlord_id {
                    return Err(ViewError::invalid(
                        "This booking is for someone else's property",
                    ));
                }
                self.repos.bookings.update_status(booking_id, next).await?;
                self.fetch(session).await
            })
            .await;

        if let Some((properties, requests)) = refreshed {
            self.publish(properties, requests);
            self.state.succeed(success);
        }
    }

    pub async fn set_property_active(
        &self,
        session: &Session,
        property_id: &PropertyId,
        active: bool,
    ) {
        let refreshed = self
            .state
            .run("set_property_active", async {
                let landlord_id = session.require_landlord()?;
                let property = self.repos.properties.get(property_id).await?;
                if &property.landlord_id != landlord_id {
                    return Err(ViewError::invalid("You can only manage your own listings"));
                }
                self.repos.properties.set_active(property_id, active).await?;
                self.fetch(session).await
            })
            .await;

        if let Some((properties, requests)) = refreshed {
            self.publish(properties, requests);
            self.state
                .succeed(if active { "Listing published" } else { "Listing hidden" });
        }
    }
}

screen_state!(LandlordDashboardState);
