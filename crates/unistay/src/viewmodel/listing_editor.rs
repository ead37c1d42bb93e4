use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Amenity, PropertyDraft, PropertyId, PropertyListing, University};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct ListingEditorState {
    pub feedback: Feedback,
    /// `None` while creating a new listing.
    pub editing: Option<PropertyId>,
    pub draft: PropertyDraft,
    pub universities: Vec<University>,
    pub amenities: Vec<Amenity>,
    pub saved: Option<PropertyListing>,
}

/// Create and edit form for a landlord's listing.
pub struct ListingEditorViewModel {
    repos: Repositories,
    state: StateHolder<ListingEditorState>,
}

impl ListingEditorViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("listing_editor", ListingEditorState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<ListingEditorState> {
        &self.state
    }

    pub async fn start_new(&self) {
        let catalog = self.state.run("start_new", self.catalog()).await;
        if let Some((universities, amenities)) = catalog {
            self.state.update(|state| {
                *state = ListingEditorState {
                    universities,
                    amenities,
                    ..ListingEditorState::default()
                };
            });
        }
    }

    pub async fn load(&self, session: &Session, property_id: &PropertyId) {
        let loaded = self
            .state
            .run("load", async {
                let landlord_id = session.require_landlord()?;
                let listing = self.repos.properties.listing(property_id).await?;
                if &listing.property.landlord_id != landlord_id {
                    return Err(ViewError::invalid("You can only edit your own listings"));
                }
                let (universities, amenities) = self.catalog().await?;
                Ok::<_, ViewError>((listing, universities, amenities))
            })
            .await;

        if let Some((listing, universities, amenities)) = loaded {
            self.state.update(|state| {
                *state = ListingEditorState {
                    editing: Some(listing.property.id.clone()),
                    draft: PropertyDraft::from(&listing),
                    universities,
                    amenities,
                    ..ListingEditorState::default()
                };
            });
        }
    }

    async fn catalog(&self) -> Result<(Vec<University>, Vec<Amenity>), ViewError> {
        let universities = self.repos.catalog.universities().await?;
        let amenities = self.repos.catalog.amenities().await?;
        Ok((universities, amenities))
    }

    /// Creates a listing, or updates the one loaded for editing.
    pub async fn save(&self, session: &Session, draft: PropertyDraft) -> Option<PropertyListing> {
        let editing = self.state.snapshot().editing;
        self.state.update(|state| state.draft = draft.clone());

        let saved = self
            .state
            .run("save", async {
                let landlord_id = session.require_landlord()?;
                let listing = match &editing {
                    Some(id) => {
                        let current = self.repos.properties.get(id).await?;
                        if &current.landlord_id != landlord_id {
                            return Err(ViewError::invalid("You can only edit your own listings"));
                        }
                        self.repos.properties.update(id, &draft).await?
                    }
                    None => self.repos.properties.create(landlord_id, &draft).await?,
                };
                Ok::<_, ViewError>(listing)
            })
            .await?;

        let created = editing.is_none();
        self.state.update(|state| {
            state.editing = Some(saved.property.id.clone());
            state.saved = Some(saved.clone());
        });
        self.state
            .succeed(if created { "Listing created" } else { "Listing updated" });
        Some(saved)
    }
}

screen_state!(ListingEditorState);
