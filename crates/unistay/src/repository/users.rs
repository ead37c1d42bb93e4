use tracing::info;

use super::{fetch_all, fetch_one, fetch_optional, mark_profile_completed, RepositoryError};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{NewUser, User, UserId, UserRole};

#[derive(Clone)]
pub struct UserRepository {
    service: SharedDataService,
}

impl UserRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    pub async fn register(&self, user: &NewUser) -> Result<User, RepositoryError> {
        if user.full_name.is_empty() {
            return Err(RepositoryError::Validation("Full name is required".to_string()));
        }
        let well_formed = user
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(RepositoryError::Validation(
                "Enter a valid email address".to_string(),
            ));
        }

        let row = self
            .service
            .insert(Table::Users, encode_row(user)?)
            .await
            .map_err(|err| {
                RepositoryError::conflict_or_backend(
                    err,
                    "An account with this email already exists",
                )
            })?;
        let user: User = decode_row(row)?;
        info!(user_id = %user.id, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.trim().to_ascii_lowercase();
        fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Users).filter(Filter::eq("email", email)),
        )
        .await
    }

    pub async fn get(&self, id: &UserId) -> Result<User, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Users).filter(Filter::eq("id", id)),
        )
        .await
    }

    pub async fn mark_profile_completed(&self, id: &UserId) -> Result<(), RepositoryError> {
        mark_profile_completed(self.service.as_ref(), id).await
    }

    /// Newest first; `None` lists every role.
    pub async fn list(&self, role: Option<UserRole>) -> Result<Vec<User>, RepositoryError> {
        let mut query = Query::table(Table::Users).order_by("created_at", true);
        if let Some(role) = role {
            query = query.filter(Filter::eq("role", role.as_str()));
        }
        fetch_all(self.service.as_ref(), query).await
    }

    pub async fn delete(&self, id: &UserId) -> Result<(), RepositoryError> {
        let removed = self
            .service
            .delete(Table::Users, Filter::eq("id", id))
            .await?;
        if removed.is_empty() {
            return Err(RepositoryError::NotFound { entity: "users" });
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::MemoryDataService;

    fn repository() -> UserRepository {
        UserRepository::new(Arc::new(MemoryDataService::new()))
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let users = repository();
        users
            .register(&NewUser::new("ana@uni.edu", "Ana", UserRole::Student))
            .await
            .expect("first registration");

        let second = users
            .register(&NewUser::new("ANA@uni.edu", "Ana Again", UserRole::Landlord))
            .await;
        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn lookup_by_email_ignores_case() {
        let users = repository();
        let created = users
            .register(&NewUser::new("lars@homes.se", "Lars", UserRole::Landlord))
            .await
            .expect("registered");

        let found = users
            .find_by_email(" Lars@Homes.SE ")
            .await
            .expect("lookup");
        assert_eq!(found.map(|user| user.id), Some(created.id.clone()));

        users.mark_profile_completed(&created.id).await.expect("marked");
        assert!(users.get(&created.id).await.expect("user").profile_completed);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let result = repository()
            .register(&NewUser::new("not-an-email", "Nobody", UserRole::Student))
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }
}
