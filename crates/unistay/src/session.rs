//! The signed-in user.
//!
//! A [`Session`] is created by sign-in or registration and passed explicitly
//! to every operation that acts on someone's behalf.

use serde::Serialize;

use crate::domain::{Landlord, LandlordId, StudentId, StudentProfile, User, UserId, UserRole};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(skip)]
    pub access_token: Option<String>,
    pub profile_completed: bool,
    pub student_id: Option<StudentId>,
    pub landlord_id: Option<LandlordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("this action requires a {expected} account")]
    WrongRole { expected: &'static str },
    #[error("complete your profile first")]
    ProfileIncomplete,
}

impl Session {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            access_token: None,
            profile_completed: user.profile_completed,
            student_id: None,
            landlord_id: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn attach_student(&mut self, profile: &StudentProfile) {
        self.student_id = Some(profile.id.clone());
        self.profile_completed = true;
    }

    pub fn attach_landlord(&mut self, landlord: &Landlord) {
        self.landlord_id = Some(landlord.id.clone());
        self.profile_completed = true;
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_role(&self, role: UserRole) -> Result<(), SessionError> {
        if self.role == role {
            Ok(())
        } else {
            Err(SessionError::WrongRole {
                expected: role.as_str(),
            })
        }
    }

    pub fn require_student(&self) -> Result<&StudentId, SessionError> {
        self.require_role(UserRole::Student)?;
        self.student_id.as_ref().ok_or(SessionError::ProfileIncomplete)
    }

    pub fn require_landlord(&self) -> Result<&LandlordId, SessionError> {
        self.require_role(UserRole::Landlord)?;
        self.landlord_id.as_ref().ok_or(SessionError::ProfileIncomplete)
    }
}
