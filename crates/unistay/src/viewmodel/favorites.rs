use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Property, PropertyId};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct FavoritesState {
    pub feedback: Feedback,
    pub properties: Vec<Property>,
}

pub struct FavoritesViewModel {
    repos: Repositories,
    state: StateHolder<FavoritesState>,
}

impl FavoritesViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("favorites", FavoritesState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<FavoritesState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        let properties = self
            .state
            .run("load", async {
                let student_id = session.require_student()?;
                Ok::<_, ViewError>(self.repos.favorites.favorite_properties(student_id).await?)
            })
            .await;
        if let Some(properties) = properties {
            self.state.update(|state| state.properties = properties);
        }
    }

    pub async fn remove(&self, session: &Session, property_id: &PropertyId) {
        let removed = self
            .state
            .run("remove", async {
                let student_id = session.require_student()?;
                Ok::<_, ViewError>(self.repos.favorites.remove(student_id, property_id).await?)
            })
            .await;
        if removed.is_some() {
            self.state.update(|state| {
                state.properties.retain(|property| &property.id != property_id);
            });
        }
    }
}

screen_state!(FavoritesState);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::marketplace;
    use crate::viewmodel::fixtures;

    #[tokio::test]
    async fn removing_a_favorite_updates_the_list() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let session = fixtures::student(&market).await;
        market
            .repos
            .favorites
            .add(&market.student, &listing.property.id)
            .await
            .expect("saved");

        let screen = FavoritesViewModel::new(market.repos.clone());
        screen.load(&session).await;
        assert_eq!(screen.state().snapshot().properties.len(), 1);

        screen.remove(&session, &listing.property.id).await;
        assert!(screen.state().snapshot().properties.is_empty());
        assert!(!market
            .repos
            .favorites
            .is_favorite(&market.student, &listing.property.id)
            .await
            .expect("lookup"));
    }
}
