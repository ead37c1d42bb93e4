use super::{Feedback, StateHolder, ViewError};
use crate::domain::{
    Landlord, LandlordProfileInput, StudentProfile, StudentProfileInput, University, UserRole,
};
use crate::repository::Repositories;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct StudentProfileState {
    pub feedback: Feedback,
    pub universities: Vec<University>,
    pub form: StudentProfileInput,
    pub profile: Option<StudentProfile>,
}

/// First-run and later edits of a student's profile.
pub struct StudentProfileViewModel {
    repos: Repositories,
    state: StateHolder<StudentProfileState>,
}

impl StudentProfileViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("student_profile", StudentProfileState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<StudentProfileState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        let loaded = self
            .state
            .run("load", async {
                session.require_role(UserRole::Student)?;
                let universities = self.repos.catalog.universities().await?;
                let profile = self.repos.students.by_user(&session.user_id).await?;
                Ok::<_, ViewError>((universities, profile))
            })
            .await;

        if let Some((universities, profile)) = loaded {
            self.state.update(|state| {
                state.universities = universities;
                state.form = profile.as_ref().map(StudentProfileInput::from).unwrap_or_default();
                state.profile = profile;
            });
        }
    }

    /// Saves the form and attaches the profile to `session`.
    pub async fn save(&self, session: &mut Session, input: StudentProfileInput) -> bool {
        self.state.update(|state| state.form = input.clone());
        let saved = self
            .state
            .run("save", async {
                session.require_role(UserRole::Student)?;
                let profile = self
                    .repos
                    .students
                    .save_profile(&session.user_id, &input)
                    .await?;
                Ok::<_, ViewError>(profile)
            })
            .await;

        match saved {
            Some(profile) => {
                session.attach_student(&profile);
                self.state.update(|state| state.profile = Some(profile));
                self.state.succeed("Profile saved");
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LandlordProfileState {
    pub feedback: Feedback,
    pub form: LandlordProfileInput,
    pub landlord: Option<Landlord>,
}

pub struct LandlordProfileViewModel {
    repos: Repositories,
    state: StateHolder<LandlordProfileState>,
}

impl LandlordProfileViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("landlord_profile", LandlordProfileState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<LandlordProfileState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        let loaded = self
            .state
            .run("load", async {
                session.require_role(UserRole::Landlord)?;
                Ok::<_, ViewError>(self.repos.landlords.by_user(&session.user_id).await?)
            })
            .await;

        if let Some(landlord) = loaded {
            self.state.update(|state| {
                if let Some(landlord) = &landlord {
                    state.form = LandlordProfileInput {
                        company_name: landlord.company_name.clone(),
                        phone: landlord.phone.clone(),
                    };
                }
                state.landlord = landlord;
            });
        }
    }

    pub async fn save(&self, session: &mut Session, input: LandlordProfileInput) -> bool {
        self.state.update(|state| state.form = input.clone());
        let saved = self
            .state
            .run("save", async {
                session.require_role(UserRole::Landlord)?;
                let landlord = self
                    .repos
                    .landlords
                    .save_profile(&session.user_id, &input)
                    .await?;
                Ok::<_, ViewError>(landlord)
            })
            .await;

        match saved {
            Some(landlord) => {
                session.attach_landlord(&landlord);
                self.state.update(|state| state.landlord = Some(landlord));
                self.state.succeed("Profile saved");
                true
            }
            None => false,
        }
    }
}

screen_state!(StudentProfileState, LandlordProfileState);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewUser, UniversityId};
    use crate::repository::fixtures::marketplace;

    #[tokio::test]
    async fn new_student_completes_profile() {
        let market = marketplace().await;
        let user = market
            .repos
            .users
            .register(&NewUser::new("new@uni.edu", "New Student", UserRole::Student))
            .await
            .expect("registered");
        let mut session = Session::from_user(&user);
        let screen = StudentProfileViewModel::new(market.repos.clone());

        screen.load(&session).await;
        let state = screen.state().snapshot();
        assert_eq!(state.universities.len(), 1);
        assert!(state.profile.is_none());

        let saved = screen
            .save(
                &mut session,
                StudentProfileInput {
                    university_id: Some(market.university.clone()),
                    budget_min: Some(300.0),
                    budget_max: Some(700.0),
                    ..StudentProfileInput::default()
                },
            )
            .await;
        assert!(saved);
        assert!(session.require_student().is_ok());
        assert_eq!(
            screen.state().snapshot().feedback.success_message.as_deref(),
            Some("Profile saved")
        );
    }

    #[tokio::test]
    async fn invalid_budget_keeps_the_form_and_shows_why() {
        let market = marketplace().await;
        let mut session = crate::viewmodel::fixtures::student(&market).await;
        let screen = StudentProfileViewModel::new(market.repos.clone());

        let input = StudentProfileInput {
            university_id: Some(UniversityId::new("uni-x")),
            budget_min: Some(900.0),
            budget_max: Some(100.0),
            ..StudentProfileInput::default()
        };
        assert!(!screen.save(&mut session, input.clone()).await);
        let state = screen.state().snapshot();
        assert_eq!(state.form, input);
        assert_eq!(
            state.feedback.error_message.as_deref(),
            Some("Minimum budget cannot exceed maximum budget")
        );
    }

    #[tokio::test]
    async fn students_cannot_open_the_landlord_form() {
        let market = marketplace().await;
        let session = crate::viewmodel::fixtures::student(&market).await;
        let screen = LandlordProfileViewModel::new(market.repos.clone());

        screen.load(&session).await;
        assert_eq!(
            screen.state().snapshot().feedback.error_message.as_deref(),
            Some("Only landlord accounts can do this")
        );
    }
}
