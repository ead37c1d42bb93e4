use tracing::info;

use super::{
    fetch_all, fetch_one, fetch_optional, mark_profile_completed, update_one, RepositoryError,
};
use crate::backend::{decode_row, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{StudentId, StudentProfile, StudentProfileInput, UserId};

#[derive(Clone)]
pub struct StudentRepository {
    service: SharedDataService,
}

impl StudentRepository {
    pub fn new(service: SharedDataService) -> Self {
        Self { service }
    }

    pub async fn by_user(&self, user_id: &UserId) -> Result<Option<StudentProfile>, RepositoryError> {
        fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Students).filter(Filter::eq("user_id", user_id)),
        )
        .await
    }

    pub async fn get(&self, id: &StudentId) -> Result<StudentProfile, RepositoryError> {
        fetch_one(
            self.service.as_ref(),
            Query::table(Table::Students).filter(Filter::eq("id", id)),
        )
        .await
    }

    /// Create or update the user's student profile and flag the account as
    /// complete.
    pub async fn save_profile(
        &self,
        user_id: &UserId,
        input: &StudentProfileInput,
    ) -> Result<StudentProfile, RepositoryError> {
        input.validate().map_err(RepositoryError::Validation)?;

        let profile: StudentProfile = match self.by_user(user_id).await? {
            Some(existing) => {
                update_one(
                    self.service.as_ref(),
                    Table::Students,
                    Filter::eq("id", &existing.id),
                    input,
                )
                .await?
            }
            None => {
                let mut row = encode_row(input)?;
                row.insert("user_id".to_string(), user_id.into());
                decode_row(self.service.insert(Table::Students, row).await?)?
            }
        };

        mark_profile_completed(self.service.as_ref(), user_id).await?;
        info!(student_id = %profile.id, "student profile saved");
        Ok(profile)
    }

    pub async fn list(&self) -> Result<Vec<StudentProfile>, RepositoryError> {
        fetch_all(self.service.as_ref(), Query::table(Table::Students)).await
    }

    pub async fn delete_for_user(&self, user_id: &UserId) -> Result<usize, RepositoryError> {
        let removed = self
            .service
            .delete(Table::Students, Filter::eq("user_id", user_id))
            .await?;
        Ok(removed.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::MemoryDataService;
    use crate::domain::{NewUser, UniversityId, UserRole};
    use crate::repository::UserRepository;

    #[tokio::test]
    async fn saving_twice_updates_the_same_profile() {
        let service: SharedDataService = Arc::new(MemoryDataService::new());
        let users = UserRepository::new(service.clone());
        let students = StudentRepository::new(service);
        let user = users
            .register(&NewUser::new("ana@uni.edu", "Ana", UserRole::Student))
            .await
            .expect("registered");

        let mut input = StudentProfileInput {
            university_id: Some(UniversityId::new("uni-000001")),
            major: Some("Physics".to_string()),
            ..StudentProfileInput::default()
        };
        let first = students.save_profile(&user.id, &input).await.expect("created");
        input.major = Some("Mathematics".to_string());
        let second = students.save_profile(&user.id, &input).await.expect("updated");

        assert_eq!(first.id, second.id);
        assert_eq!(second.major.as_deref(), Some("Mathematics"));
        assert_eq!(students.list().await.expect("list").len(), 1);
        assert!(users.get(&user.id).await.expect("user").profile_completed);
    }

    #[tokio::test]
    async fn invalid_input_is_not_written() {
        let service: SharedDataService = Arc::new(MemoryDataService::new());
        let students = StudentRepository::new(service);
        let result = students
            .save_profile(&UserId::new("usr-1"), &StudentProfileInput::default())
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }
}
