use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Landlord, PropertyId, PropertyListing, Review};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct PropertyDetailState {
    pub feedback: Feedback,
    pub listing: Option<PropertyListing>,
    pub landlord: Option<Landlord>,
    pub reviews: Vec<Review>,
    pub is_favorite: bool,
}

pub struct PropertyDetailViewModel {
    repos: Repositories,
    state: StateHolder<PropertyDetailState>,
}

impl PropertyDetailViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("property_detail", PropertyDetailState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<PropertyDetailState> {
        &self.state
    }

    /// Favorite state is only looked up for signed-in students.
    pub async fn load(&self, session: Option<&Session>, property_id: &PropertyId) {
        let loaded = self
            .state
            .run("load", async {
                let listing = self.repos.properties.listing(property_id).await?;
                let landlord = self
                    .repos
                    .landlords
                    .get(&listing.property.landlord_id)
                    .await?;
                let reviews = self.repos.reviews.for_property(property_id).await?;
                let is_favorite = match session.and_then(|session| session.student_id.as_ref()) {
                    Some(student_id) => {
                        self.repos
                            .favorites
                            .is_favorite(student_id, property_id)
                            .await?
                    }
                    None => false,
                };
                Ok::<_, ViewError>((listing, landlord, reviews, is_favorite))
            })
            .await;

        if let Some((listing, landlord, reviews, is_favorite)) = loaded {
            self.state.update(|state| {
                state.listing = Some(listing);
                state.landlord = Some(landlord);
                state.reviews = reviews;
                state.is_favorite = is_favorite;
            });
        }
    }

    pub async fn toggle_favorite(&self, session: &Session) {
        let Some(property_id) = self
            .state
            .snapshot()
            .listing
            .map(|listing| listing.property.id)
        else {
            return;
        };

        let toggled = self
            .state
            .run("toggle_favorite", async {
                let student_id = session.require_student()?;
                Ok::<_, ViewError>(self.repos.favorites.toggle(student_id, &property_id).await?)
            })
            .await;

        if let Some(is_favorite) = toggled {
            self.state.update(|state| state.is_favorite = is_favorite);
            self.state.succeed(if is_favorite {
                "Saved to favorites"
            } else {
                "Removed from favorites"
            });
        }
    }
}

screen_state!(PropertyDetailState);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::marketplace;
    use crate::viewmodel::fixtures;

    #[tokio::test]
    async fn detail_shows_landlord_and_tracks_favorite() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let session = fixtures::student(&market).await;
        let screen = PropertyDetailViewModel::new(market.repos.clone());

        screen.load(Some(&session), &listing.property.id).await;
        let state = screen.state().snapshot();
        assert_eq!(
            state.landlord.and_then(|landlord| landlord.company_name).as_deref(),
            Some("Berg Homes")
        );
        assert!(!state.is_favorite);

        screen.toggle_favorite(&session).await;
        assert!(screen.state().snapshot().is_favorite);
        screen.toggle_favorite(&session).await;
        assert!(!screen.state().snapshot().is_favorite);
    }

    #[tokio::test]
    async fn landlords_cannot_favorite() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let session = fixtures::landlord(&market).await;
        let screen = PropertyDetailViewModel::new(market.repos.clone());

        screen.load(Some(&session), &listing.property.id).await;
        screen.toggle_favorite(&session).await;
        let state = screen.state().snapshot();
        assert!(!state.is_favorite);
        assert_eq!(
            state.feedback.error_message.as_deref(),
            Some("Only student accounts can do this")
        );
    }

    #[tokio::test]
    async fn missing_property_reports_an_error() {
        let market = marketplace().await;
        let screen = PropertyDetailViewModel::new(market.repos.clone());
        screen.load(None, &PropertyId::new("prop-gone")).await;
        assert_eq!(
            screen.state().snapshot().feedback.error_message.as_deref(),
            Some("That item is no longer available")
        );
    }
}
