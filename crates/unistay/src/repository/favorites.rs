use tracing::debug;

use super::{fetch_all, fetch_optional, RepositoryError};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{Favorite, NewFavorite, Property, PropertyId, StudentId};

#[derive(Clone)]
pub struct FavoriteRepository {
    service: SharedDataService,
}

impl FavoriteRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    fn pair(student_id: &StudentId, property_id: &PropertyId) -> Filter {
        Filter::eq("student_id", student_id).and(Filter::eq("property_id", property_id))
    }

    pub async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Favorite>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Favorites)
                .filter(Filter::eq("student_id", student_id))
                .order_by("created_at", true),
        )
        .await
    }

    /// Saved properties that are still active, most recently saved first.
    pub async fn favorite_properties(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Property>, RepositoryError> {
        let favorites = self.list_for_student(student_id).await?;
        if favorites.is_empty() {
            return Ok(Vec::new());
        }
        let properties: Vec<Property> = fetch_all(
            self.service.as_ref(),
            Query::table(Table::Properties).filter(Filter::is_in(
                "id",
                favorites.iter().map(|favorite| &favorite.property_id),
            )),
        )
        .await?;

        Ok(favorites
            .iter()
            .filter_map(|favorite| {
                properties
                    .iter()
                    .find(|property| property.id == favorite.property_id && property.is_active)
                    .cloned()
            })
            .collect())
    }

    pub async fn is_favorite(
        &self,
        student_id: &StudentId,
        property_id: &PropertyId,
    ) -> Result<bool, RepositoryError> {
        let existing: Option<Favorite> = fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Favorites).filter(Self::pair(student_id, property_id)),
        )
        .await?;
        Ok(existing.is_some())
    }

    /// Saving an already saved property returns the existing favorite.
    pub async fn add(
        &self,
        student_id: &StudentId,
        property_id: &PropertyId,
    ) -> Result<Favorite, RepositoryError> {
        let existing: Option<Favorite> = fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Favorites).filter(Self::pair(student_id, property_id)),
        )
        .await?;
        if let Some(favorite) = existing {
            return Ok(favorite);
        }

        let favorite = NewFavorite {
            student_id: student_id.clone(),
            property_id: property_id.clone(),
        };
        let row = self
            .service
            .insert(Table::Favorites, encode_row(&favorite)?)
            .await?;
        debug!(student_id = %student_id, property_id = %property_id, "favorite added");
        Ok(decode_row(row)?)
    }

    /// Returns whether anything was removed.
    pub async fn remove(
        &self,
        student_id: &StudentId,
        property_id: &PropertyId,
    ) -> Result<bool, RepositoryError> {
        let removed = self
            .service
            .delete(Table::Favorites, Self::pair(student_id, property_id))
            .await?;
        Ok(!removed.is_empty())
    }

    /// Flip the saved state; returns the new state.
    pub async fn toggle(
        &self,
        student_id: &StudentId,
        property_id: &PropertyId,
    ) -> Result<bool, RepositoryError> {
        if self.is_favorite(student_id, property_id).await? {
            self.remove(student_id, property_id).await?;
            Ok(false)
        } else {
            self.add(student_id, property_id).await?;
            Ok(true)
        }
    }

    pub async fn delete_for_student(&self, student_id: &StudentId) -> Result<usize, RepositoryError> {
        let removed = self
            .service
            .delete(Table::Favorites, Filter::eq("student_id", student_id))
            .await?;
        Ok(removed.len())
    }
}
