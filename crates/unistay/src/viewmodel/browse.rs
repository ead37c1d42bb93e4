use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Amenity, PropertyListing, University};
use crate::repository::Repositories;
use crate::search::{PropertyFilter, SortOrder};

#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    pub feedback: Feedback,
    pub listings: Vec<PropertyListing>,
    pub visible: Vec<PropertyListing>,
    pub filter: PropertyFilter,
    pub universities: Vec<University>,
    pub amenities: Vec<Amenity>,
}

/// Search and filter over every active listing, fetched once per load.
pub struct PropertyBrowseViewModel {
    repos: Repositories,
    state: StateHolder<BrowseState>,
}

impl PropertyBrowseViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("browse", BrowseState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<BrowseState> {
        &self.state
    }

    pub async fn load(&self) {
        let loaded = self
            .state
            .run("load", async {
                let properties = self.repos.properties.list_active().await?;
                let listings = self.repos.properties.listings(properties).await?;
                let universities = self.repos.catalog.universities().await?;
                let amenities = self.repos.catalog.amenities().await?;
                Ok::<_, ViewError>((listings, universities, amenities))
            })
            .await;

        if let Some((listings, universities, amenities)) = loaded {
            self.state.update(|state| {
                state.visible = state.filter.apply(&listings);
                state.listings = listings;
                state.universities = universities;
                state.amenities = amenities;
            });
        }
    }

    pub fn apply_filter(&self, filter: PropertyFilter) {
        self.state.update(|state| {
            state.visible = filter.apply(&state.listings);
            state.filter = filter;
        });
    }

    pub fn search(&self, query: &str) {
        let mut filter = self.state.snapshot().filter;
        filter.query = query.to_string();
        self.apply_filter(filter);
    }

    pub fn sort_by(&self, sort: SortOrder) {
        let mut filter = self.state.snapshot().filter;
        filter.sort = sort;
        self.apply_filter(filter);
    }

    pub fn clear_filters(&self) {
        self.apply_filter(PropertyFilter::default());
    }
}

screen_state!(BrowseState);
