use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BookingId, FavoriteId, LandlordId, PropertyId, ReviewId, StudentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub booking_id: BookingId,
    pub property_id: PropertyId,
    pub student_id: StudentId,
    pub landlord_id: LandlordId,
    pub property_rating: u8,
    pub landlord_rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub booking_id: BookingId,
    pub property_id: PropertyId,
    pub student_id: StudentId,
    pub landlord_id: LandlordId,
    pub property_rating: u8,
    pub landlord_rating: u8,
    pub comment: Option<String>,
}

/// What a student submits after a completed stay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub booking_id: BookingId,
    pub student_id: StudentId,
    pub property_rating: u8,
    pub landlord_rating: u8,
    pub comment: Option<String>,
}

impl ReviewSubmission {
    pub fn validate(&self) -> Result<(), String> {
        for rating in [self.property_rating, self.landlord_rating] {
            if !(1..=5).contains(&rating) {
                return Err("Ratings must be between 1 and 5 stars".to_string());
            }
        }
        if self
            .comment
            .as_deref()
            .is_some_and(|comment| comment.chars().count() > 1000)
        {
            return Err("Comments are limited to 1000 characters".to_string());
        }
        Ok(())
    }

    /// Blank comments are stored as absent.
    pub fn normalized_comment(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub student_id: StudentId,
    pub property_id: PropertyId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFavorite {
    pub student_id: StudentId,
    pub property_id: PropertyId,
}
