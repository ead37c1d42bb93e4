use super::{fetch_all, fetch_one, RepositoryError};
use crate::backend::{Filter, Query, SharedDataService, Table};
use crate::domain::{Amenity, University, UniversityId};

/// Reference tables: universities and amenities.
#[derive(Clone)]
pub struct CatalogRepository {
    service: SharedDataService,
}

impl CatalogRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    pub async fn universities(&self) -> Result<Vec<University>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Universities).order_by("name", false),
        )
        .await
    }

    pub async fn university(&self, id: &UniversityId) -> Result<University, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Universities).filter(Filter::eq("id", id)),
        )
        .await
    }

    pub async fn amenities(&self) -> Result<Vec<Amenity>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Amenities).order_by("name", false),
        )
        .await
    }
}
