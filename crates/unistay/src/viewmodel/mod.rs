//! Per-screen view state.
//!
//! Every screen owns a [`StateHolder`] publishing `Clone` snapshots over a
//! `watch` channel. Operations run against the repositories; failures never
//! escape to the caller but become the snapshot's `error_message`, with the
//! cause logged at `warn`.

macro_rules! screen_state {
    ($($state:ty),+ $(,)?) => {$(
        impl $crate::viewmodel::ScreenState for $state {
            fn feedback(&self) -> &$crate::viewmodel::Feedback {
                &self.feedback
            }

            fn feedback_mut(&mut self) -> &mut $crate::viewmodel::Feedback {
                &mut self.feedback
            }
        }
    )+};
}

mod admin;
mod auth;
mod booking;
mod browse;
mod favorites;
mod landlord;
mod listing_editor;
mod map;
mod my_bookings;
mod profile;
mod property_detail;
mod review;

pub use admin::{AdminDashboardState, AdminDashboardViewModel};
pub use auth::{RegisterState, RegisterViewModel, SignInState, SignInViewModel};
pub use booking::{BookingRequestState, BookingRequestViewModel};
pub use browse::{BrowseState, PropertyBrowseViewModel};
pub use favorites::{FavoritesState, FavoritesViewModel};
pub use landlord::{IncomingRequest, LandlordDashboardState, LandlordDashboardViewModel};
pub use listing_editor::{ListingEditorState, ListingEditorViewModel};
pub use map::{MapState, MapViewModel, DEFAULT_RADIUS_KM};
pub use my_bookings::{StudentBookingEntry, StudentBookingsState, StudentBookingsViewModel};
pub use profile::{
    LandlordProfileState, LandlordProfileViewModel, StudentProfileState, StudentProfileViewModel,
};
pub use property_detail::{PropertyDetailState, PropertyDetailViewModel};
pub use review::{ReviewState, ReviewViewModel};

use std::future::Future;

use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use crate::repository::RepositoryError;
use crate::session::SessionError;

/// Progress and outcome flags every screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

pub trait ScreenState: Clone + Send + Sync + 'static {
    fn feedback(&self) -> &Feedback;
    fn feedback_mut(&mut self) -> &mut Feedback;
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Invalid(String),
}

impl ViewError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Text shown on screen; backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ViewError::Repository(RepositoryError::Validation(message))
            | ViewError::Repository(RepositoryError::Conflict(message))
            | ViewError::Invalid(message) => message.clone(),
            ViewError::Repository(RepositoryError::NotFound { .. }) => {
                "That item is no longer available".to_string()
            }
            ViewError::Repository(
                RepositoryError::Backend(_) | RepositoryError::Unavailable(_),
            ) => "Something went wrong. Please try again.".to_string(),
            ViewError::Session(SessionError::WrongRole { expected }) => {
                format!("Only {expected} accounts can do this")
            }
            ViewError::Session(SessionError::ProfileIncomplete) => {
                "Complete your profile first".to_string()
            }
        }
    }
}

/// Observable state of one screen.
pub struct StateHolder<S> {
    screen: &'static str,
    state: watch::Sender<S>,
}

impl<S: ScreenState> StateHolder<S> {
    pub fn new(screen: &'static str, initial: S) -> Self {
        let (state, _) = watch::channel(initial);
        Self { screen, state }
    }

    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub fn update(&self, apply: impl FnOnce(&mut S)) {
        self.state.send_modify(apply);
    }

    pub fn clear_messages(&self) {
        self.update(|state| {
            let feedback = state.feedback_mut();
            feedback.error_message = None;
            feedback.success_message = None;
        });
    }

    /// Run `work` with the loading flag raised. An error becomes the
    /// snapshot's `error_message` and yields `None`.
    pub async fn run<T, F>(&self, operation: &'static str, work: F) -> Option<T>
    where
        F: Future<Output = Result<T, ViewError>>,
    {
        self.update(|state| {
            *state.feedback_mut() = Feedback {
                is_loading: true,
                ..Feedback::default()
            };
        });

        match work.await {
            Ok(value) => {
                self.update(|state| state.feedback_mut().is_loading = false);
                Some(value)
            }
            Err(err) => {
                warn!(screen = self.screen, operation, error = %err, "screen operation failed");
                let message = err.user_message();
                self.update(|state| {
                    let feedback = state.feedback_mut();
                    feedback.is_loading = false;
                    feedback.error_message = Some(message);
                });
                None
            }
        }
    }

    pub fn succeed(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| state.feedback_mut().success_message = Some(message));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        feedback: Feedback,
        value: u32,
    }

    screen_state!(CounterState);

    #[tokio::test]
    async fn failures_become_messages() {
        let holder = StateHolder::new("counter", CounterState::default());
        let mut updates = holder.subscribe();

        let outcome: Option<()> = holder
            .run("increment", async {
                Err(ViewError::Repository(RepositoryError::Validation(
                    "Too many".to_string(),
                )))
            })
            .await;

        assert!(outcome.is_none());
        assert!(updates.has_changed().expect("sender alive"));
        let state = updates.borrow_and_update().clone();
        assert!(!state.feedback.is_loading);
        assert_eq!(state.feedback.error_message.as_deref(), Some("Too many"));

        holder.clear_messages();
        assert_eq!(holder.snapshot().feedback, Feedback::default());
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let holder = StateHolder::new("counter", CounterState::default());
        holder.update(|state| state.feedback.error_message = Some("old".to_string()));

        let value = holder.run("increment", async { Ok::<_, ViewError>(3) }).await;
        holder.update(|state| state.value = value.unwrap_or_default());

        let state = holder.snapshot();
        assert_eq!(state.value, 3);
        assert_eq!(state.feedback, Feedback::default());
    }

    #[test]
    fn backend_details_are_not_shown() {
        let err = ViewError::Repository(RepositoryError::Backend(
            crate::backend::BackendError::Transport("tcp reset by 10.0.0.7".to_string()),
        ));
        assert!(!err.user_message().contains("10.0.0.7"));
    }
}
