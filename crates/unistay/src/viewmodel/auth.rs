use tracing::info;

use super::{Feedback, StateHolder, ViewError};
use crate::domain::{NewUser, User, UserRole};
use crate::repository::{Repositories, RepositoryError};
use crate::session::Session;

/// Build a session for `user`, attaching the role profile when one exists.
pub(crate) async fn open_session(
    repos: &Repositories,
    user: &User,
) -> Result<Session, RepositoryError> {
    let mut session = Session::from_user(user);
    match user.role {
        UserRole::Student => {
            if let Some(profile) = repos.students.by_user(&user.id).await? {
                session.attach_student(&profile);
            }
        }
        UserRole::Landlord => {
            if let Some(landlord) = repos.landlords.by_user(&user.id).await? {
                session.attach_landlord(&landlord);
            }
        }
        UserRole::Admin => {}
    }
    Ok(session)
}

#[derive(Debug, Clone, Default)]
pub struct SignInState {
    pub feedback: Feedback,
    pub email: String,
    pub session: Option<Session>,
}

pub struct SignInViewModel {
    repos: Repositories,
    state: StateHolder<SignInState>,
}

impl SignInViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("sign_in", SignInState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<SignInState> {
        &self.state
    }

    /// Credentials are checked by the hosted auth service; this resolves the
    /// account row for the verified email.
    pub async fn sign_in(&self, email: &str, access_token: Option<String>) -> Option<Session> {
        let email = email.trim().to_string();
        self.state.update(|state| state.email = email.clone());
        if email.is_empty() {
            self.state.update(|state| {
                state.feedback.error_message = Some("Enter your email address".to_string());
            });
            return None;
        }

        let session = self
            .state
            .run("sign_in", async {
                let user = self
                    .repos
                    .users
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| ViewError::invalid("No account found for that email"))?;
                let session = open_session(&self.repos, &user).await?;
                Ok::<_, ViewError>(match access_token {
                    Some(token) => session.with_token(token),
                    None => session,
                })
            })
            .await?;

        info!(user_id = %session.user_id, role = session.role.as_str(), "signed in");
        self.state.update(|state| state.session = Some(session.clone()));
        Some(session)
    }

    pub fn sign_out(&self) {
        self.state.update(|state| *state = SignInState::default());
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterState {
    pub feedback: Feedback,
    pub session: Option<Session>,
}

pub struct RegisterViewModel {
    repos: Repositories,
    state: StateHolder<RegisterState>,
}

impl RegisterViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("register", RegisterState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<RegisterState> {
        &self.state
    }

    pub async fn register(&self, email: &str, full_name: &str, role: UserRole) -> Option<Session> {
        let session = self
            .state
            .run("register", async {
                let user = self
                    .repos
                    .users
                    .register(&NewUser::new(email, full_name, role))
                    .await?;
                Ok::<_, ViewError>(Session::from_user(&user))
            })
            .await?;

        self.state.update(|state| state.session = Some(session.clone()));
        self.state.succeed(if session.profile_completed {
            "Account created"
        } else {
            "Account created. Complete your profile to continue."
        });
        Some(session)
    }
}

screen_state!(SignInState, RegisterState);
