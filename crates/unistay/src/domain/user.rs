use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LandlordId, StudentId, UniversityId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Landlord,
    Admin,
}

impl UserRole {
    pub const fn ordered() -> [Self; 3] {
        [Self::Student, Self::Landlord, Self::Admin]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Landlord => "landlord",
            Self::Admin => "admin",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Landlord => "Landlord",
            Self::Admin => "Administrator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub profile_completed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub profile_completed: bool,
}

impl NewUser {
    /// Admin accounts have no profile to fill in.
    pub fn new(email: &str, full_name: &str, role: UserRole) -> Self {
        Self {
            email: email.trim().to_ascii_lowercase(),
            full_name: full_name.trim().to_string(),
            role,
            profile_completed: role == UserRole::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub user_id: UserId,
    #[serde(default)]
    pub university_id: Option<UniversityId>,
    #[serde(default)]
    pub budget_min: Option<f64>,
    #[serde(default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub year_of_study: Option<u8>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Editable half of a student profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfileInput {
    pub university_id: Option<UniversityId>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub major: Option<String>,
    pub year_of_study: Option<u8>,
    pub phone: Option<String>,
}

impl StudentProfileInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.university_id.is_none() {
            return Err("Please select your university".to_string());
        }
        for budget in [self.budget_min, self.budget_max].into_iter().flatten() {
            if !budget.is_finite() || budget < 0.0 {
                return Err("Budget must be a positive amount".to_string());
            }
        }
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err("Minimum budget cannot exceed maximum budget".to_string());
            }
        }
        if let Some(year) = self.year_of_study {
            if !(1..=8).contains(&year) {
                return Err("Year of study must be between 1 and 8".to_string());
            }
        }
        Ok(())
    }
}

impl From<&StudentProfile> for StudentProfileInput {
    fn from(profile: &StudentProfile) -> Self {
        Self {
            university_id: profile.university_id.clone(),
            budget_min: profile.budget_min,
            budget_max: profile.budget_max,
            major: profile.major.clone(),
            year_of_study: profile.year_of_study,
            phone: profile.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landlord {
    pub id: LandlordId,
    pub user_id: UserId,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandlordProfileInput {
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

impl LandlordProfileInput {
    pub fn validate(&self) -> Result<(), String> {
        match self.phone.as_deref().map(str::trim) {
            Some(phone) if phone.chars().filter(char::is_ascii_digit).count() >= 7 => Ok(()),
            _ => Err("A contact phone number with at least 7 digits is required".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_normalizes_email_and_admin_profile_flag() {
        let student = NewUser::new("  Ana@Uni.EDU ", " Ana Lopez ", UserRole::Student);
        assert_eq!(student.email, "ana@uni.edu");
        assert_eq!(student.full_name, "Ana Lopez");
        assert!(!student.profile_completed);

        let admin = NewUser::new("ops@unistay.app", "Ops", UserRole::Admin);
        assert!(admin.profile_completed);
    }

    #[test]
    fn student_profile_budget_must_be_ordered() {
        let mut input = StudentProfileInput {
            university_id: Some(UniversityId::new("uni-000001")),
            budget_min: Some(600.0),
            budget_max: Some(400.0),
            ..StudentProfileInput::default()
        };
        assert!(input.validate().is_err());

        input.budget_max = Some(900.0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(UserRole::parse("Landlord"), Some(UserRole::Landlord));
        assert_eq!(UserRole::parse("guest"), None);
    }
}
