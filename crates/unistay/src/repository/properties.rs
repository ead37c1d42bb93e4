use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, info};

use super::{fetch_all, fetch_one, update_one, RepositoryError};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{
    Amenity, AmenityId, LandlordId, NewPropertyAmenity, NewPropertyImage, Property, PropertyDraft,
    PropertyId, PropertyImage, PropertyListing,
};

#[derive(Clone)]
pub struct PropertyRepository {
    service: SharedDataService,
}

impl PropertyRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    /// Active listings, newest first.
    pub async fn list_active(&self) -> Result<Vec<Property>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Properties)
                .filter(Filter::eq("is_active", true))
                .order_by("created_at", true),
        )
        .await
    }

    /// Everything the landlord owns, including deactivated listings.
    pub async fn list_by_landlord(
        &self,
        landlord_id: &LandlordId,
    ) -> Result<Vec<Property>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Properties)
                .filter(Filter::eq("landlord_id", landlord_id))
                .order_by("created_at", true),
        )
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Property>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Properties).order_by("created_at", true),
        )
        .await
    }

    pub async fn list_by_ids(&self, ids: &[PropertyId]) -> Result<Vec<Property>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Properties).filter(Filter::is_in("id", ids)),
        )
        .await
    }

    pub async fn get(&self, id: &PropertyId) -> Result<Property, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Properties).filter(Filter::eq("id", id)),
        )
        .await
    }

    pub async fn listing(&self, id: &PropertyId) -> Result<PropertyListing, RepositoryError> {
        let property = self.get(id).await?;
        let mut listings = self.listings(vec![property]).await?;
        listings.pop().ok_or(RepositoryError::NotFound {
            entity: "properties",
        })
    }

    /// Attach images and amenities with one read per table.
    pub async fn listings(
        &self,
        properties: Vec<Property>,
    ) -> Result<Vec<PropertyListing>, RepositoryError> {
        if properties.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&PropertyId> = properties.iter().map(|property| &property.id).collect();

        let images: Vec<PropertyImage> = fetch_all(
            self.service.as_ref(),
            Query::table(Table::PropertyImages)
                .filter(Filter::is_in("property_id", ids.iter().copied()))
                .order_by("position", false),
        )
        .await?;
        let links: Vec<NewPropertyAmenity> = fetch_all(
            self.service.as_ref(),
            Query::table(Table::PropertyAmenities)
                .filter(Filter::is_in("property_id", ids.iter().copied())),
        )
        .await?;
        let amenities = self.amenities_by_id(&links).await?;

        let mut images_by_property: HashMap<PropertyId, Vec<PropertyImage>> = HashMap::new();
        for image in images {
            images_by_property
                .entry(image.property_id.clone())
                .or_default()
                .push(image);
        }
        let mut amenities_by_property: HashMap<PropertyId, Vec<Amenity>> = HashMap::new();
        for link in links {
            if let Some(amenity) = amenities.get(&link.amenity_id) {
                amenities_by_property
                    .entry(link.property_id)
                    .or_default()
                    .push(amenity.clone());
            }
        }

        Ok(properties
            .into_iter()
            .map(|property| PropertyListing {
                images: images_by_property.remove(&property.id).unwrap_or_default(),
                amenities: amenities_by_property.remove(&property.id).unwrap_or_default(),
                property,
            })
            .collect())
    }

    async fn amenities_by_id(
        &self,
        links: &[NewPropertyAmenity],
    ) -> Result<HashMap<AmenityId, Amenity>, RepositoryError> {
        if links.is_empty() {
            return Ok(HashMap::new());
        }
        let amenities: Vec<Amenity> = fetch_all(
            self.service.as_ref(),
            Query::table(Table::Amenities)
                .filter(Filter::is_in("id", links.iter().map(|link| &link.amenity_id))),
        )
        .await?;
        Ok(amenities
            .into_iter()
            .map(|amenity| (amenity.id.clone(), amenity))
            .collect())
    }

    pub async fn create(
        &self,
        landlord_id: &LandlordId,
        draft: &PropertyDraft,
    ) -> Result<PropertyListing, RepositoryError> {
        draft.validate().map_err(RepositoryError::Validation)?;

        let mut row = encode_row(&draft.to_columns())?;
        row.insert("landlord_id".to_string(), landlord_id.into());
        row.insert("is_active".to_string(), true.into());
        row.insert("rating".to_string(), 0.0.into());
        row.insert("review_count".to_string(), 0.into());
        let property: Property = decode_row(self.service.insert(Table::Properties, row).await?)?;

        self.write_gallery(&property.id, draft).await?;
        info!(property_id = %property.id, landlord_id = %landlord_id, "property listed");
        self.listing(&property.id).await
    }

    /// Replaces the column values, the gallery, and the amenity set.
    pub async fn update(
        &self,
        id: &PropertyId,
        draft: &PropertyDraft,
    ) -> Result<PropertyListing, RepositoryError> {
        draft.validate().map_err(RepositoryError::Validation)?;

        let _: Property = update_one(
            self.service.as_ref(),
            Table::Properties,
            Filter::eq("id", id),
            &draft.to_columns(),
        )
        .await?;
        self.clear_gallery(id).await?;
        self.write_gallery(id, draft).await?;
        info!(property_id = %id, "property updated");
        self.listing(id).await
    }

    async fn write_gallery(
        &self,
        id: &PropertyId,
        draft: &PropertyDraft,
    ) -> Result<(), RepositoryError> {
        let urls = draft
            .image_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty());
        for (position, url) in urls.enumerate() {
            let image = NewPropertyImage {
                property_id: id.clone(),
                url: url.to_string(),
                position: position as u32,
            };
            self.service
                .insert(Table::PropertyImages, encode_row(&image)?)
                .await?;
        }

        let mut seen = Vec::new();
        for amenity_id in &draft.amenity_ids {
            if seen.contains(&amenity_id) {
                continue;
            }
            seen.push(amenity_id);
            let link = NewPropertyAmenity {
                property_id: id.clone(),
                amenity_id: amenity_id.clone(),
            };
            self.service
                .insert(Table::PropertyAmenities, encode_row(&link)?)
                .await?;
        }
        Ok(())
    }

    async fn clear_gallery(&self, id: &PropertyId) -> Result<(), RepositoryError> {
        let images = self
            .service
            .delete(Table::PropertyImages, Filter::eq("property_id", id))
            .await?;
        let links = self
            .service
            .delete(Table::PropertyAmenities, Filter::eq("property_id", id))
            .await?;
        debug!(
            property_id = %id,
            images = images.len(),
            amenities = links.len(),
            "cleared gallery"
        );
        Ok(())
    }

    pub async fn set_active(&self, id: &PropertyId, active: bool) -> Result<Property, RepositoryError> {
        let property: Property = update_one(
            self.service.as_ref(),
            Table::Properties,
            Filter::eq("id", id),
            &json!({ "is_active": active }),
        )
        .await?;
        info!(property_id = %id, active, "property activation changed");
        Ok(property)
    }

    /// Deactivate every listing of a landlord; returns how many changed.
    pub async fn deactivate_for_landlord(
        &self,
        landlord_id: &LandlordId,
    ) -> Result<usize, RepositoryError> {
        let rows = self
            .service
            .update(
                Table::Properties,
                Filter::eq("landlord_id", landlord_id),
                encode_row(&json!({ "is_active": false }))?,
            )
            .await?;
        Ok(rows.len())
    }

    pub async fn delete(&self, id: &PropertyId) -> Result<(), RepositoryError> {
        self.clear_gallery(id).await?;
        let removed = self
            .service
            .delete(Table::Properties, Filter::eq("id", id))
            .await?;
        if removed.is_empty() {
            return Err(RepositoryError::NotFound {
                entity: "properties",
            });
        }
        info!(property_id = %id, "property deleted");
        Ok(())
    }
}
