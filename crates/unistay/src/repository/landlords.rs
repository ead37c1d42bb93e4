use serde_json::json;
use tracing::info;

use super::{
    fetch_all, fetch_one, fetch_optional, mark_profile_completed, update_one, RepositoryError,
};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{Landlord, LandlordId, LandlordProfileInput, UserId};

#[derive(Clone)]
pub struct LandlordRepository {
    service: SharedDataService,
}

impl LandlordRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    pub async fn by_user(&self, user_id: &UserId) -> Result<Option<Landlord>, RepositoryError> {
        fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Landlords).filter(Filter::eq("user_id", user_id)),
        )
        .await
    }

    pub async fn get(&self, id: &LandlordId) -> Result<Landlord, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Landlords).filter(Filter::eq("id", id)),
        )
        .await
    }

    /// New landlords start unverified with no rating.
    pub async fn save_profile(
        &self,
        user_id: &UserId,
        input: &LandlordProfileInput,
    ) -> Result<Landlord, RepositoryError> {
        input.validate().map_err(RepositoryError::Validation)?;
        let columns = json!({
            "company_name": input.company_name.as_deref().map(str::trim).filter(|name| !name.is_empty()),
            "phone": input.phone.as_deref().map(str::trim),
        });

        let landlord: Landlord = match self.by_user(user_id).await? {
            Some(existing) => {
                update_one(
                    self.service.as_ref(),
                    Table::Landlords,
                    Filter::eq("id", &existing.id),
                    &columns,
                )
                .await?
            }
            None => {
                let mut row = encode_row(&columns)?;
                row.insert("user_id".to_string(), user_id.into());
                row.insert("verified".to_string(), false.into());
                row.insert("rating".to_string(), 0.0.into());
                row.insert("review_count".to_string(), 0.into());
                decode_row(self.service.insert(Table::Landlords, row).await?)?
            }
        };

        mark_profile_completed(self.service.as_ref(), user_id).await?;
        info!(landlord_id = %landlord.id, "landlord profile saved");
        Ok(landlord)
    }

    pub async fn set_verified(
        &self,
        id: &LandlordId,
        verified: bool,
    ) -> Result<Landlord, RepositoryError> {
        let landlord: Landlord = update_one(
            self.service.as_ref(),
            Table::Landlords,
            Filter::eq("id", id),
            &json!({ "verified": verified }),
        )
        .await?;
        info!(landlord_id = %id, verified, "landlord verification changed");
        Ok(landlord)
    }

    /// `None` lists every landlord.
    pub async fn list(&self, verified: Option<bool>) -> Result<Vec<Landlord>, RepositoryError> {
        let mut query = Query::table(Table::Landlords);
        if let Some(verified) = verified {
            query = query.filter(Filter::eq("verified", verified));
        }
        fetch_all(self.service.as_ref(), query).await
    }

    pub async fn delete_for_user(&self, user_id: &UserId) -> Result<usize, RepositoryError> {
        let removed = self
            .service
            .delete(Table::Landlords, Filter::eq("user_id", user_id))
            .await?;
        Ok(removed.len())
    }
}
