use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AmenityId, LandlordId, PropertyId, UniversityId};
use crate::geo::GeoPoint;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub landlord_id: LandlordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub price_per_month: f64,
    #[serde(default)]
    pub deposit: Option<f64>,
    #[serde(default)]
    pub bedrooms: u8,
    #[serde(default)]
    pub bathrooms: u8,
    #[serde(default)]
    pub max_occupants: u8,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_to: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub university_id: Option<UniversityId>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Property {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Whether `[start, end]` sits inside the advertised availability window.
    pub fn window_contains(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let after_open = self.available_from.map_or(true, |from| start >= from);
        let before_close = self.available_to.map_or(true, |to| end <= to);
        after_open && before_close
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub id: String,
    pub property_id: PropertyId,
    pub url: String,
    #[serde(default)]
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPropertyImage {
    pub property_id: PropertyId,
    pub url: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: AmenityId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPropertyAmenity {
    pub property_id: PropertyId,
    pub amenity_id: AmenityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: UniversityId,
    pub name: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl University {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A property together with its gallery and amenities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyListing {
    pub property: Property,
    pub images: Vec<PropertyImage>,
    pub amenities: Vec<Amenity>,
}

impl PropertyListing {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }

    pub fn has_amenity(&self, amenity: &AmenityId) -> bool {
        self.amenities.iter().any(|candidate| &candidate.id == amenity)
    }
}

/// Listing form as a landlord fills it in; images are URLs of already
/// uploaded files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price_per_month: f64,
    pub deposit: Option<f64>,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub max_occupants: u8,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
    pub university_id: Option<UniversityId>,
    pub image_urls: Vec<String>,
    pub amenity_ids: Vec<AmenityId>,
}

impl PropertyDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.address.trim().is_empty() || self.city.trim().is_empty() {
            return Err("Address and city are required".to_string());
        }
        if !self.price_per_month.is_finite() || self.price_per_month <= 0.0 {
            return Err("Monthly price must be greater than zero".to_string());
        }
        if self.deposit.is_some_and(|deposit| deposit < 0.0) {
            return Err("Deposit cannot be negative".to_string());
        }
        if self.bedrooms == 0 || self.max_occupants == 0 {
            return Err("Bedrooms and capacity must be at least 1".to_string());
        }
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err("Coordinates are out of range".to_string());
            }
        } else if self.latitude.is_some() != self.longitude.is_some() {
            return Err("Provide both latitude and longitude".to_string());
        }
        if let (Some(from), Some(to)) = (self.available_from, self.available_to) {
            if to <= from {
                return Err("Availability must end after it starts".to_string());
            }
        }
        Ok(())
    }

    /// Column values for the `properties` row; images and amenities live in
    /// their own tables.
    pub(crate) fn to_columns(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title.trim(),
            "description": self.description,
            "address": self.address.trim(),
            "city": self.city.trim(),
            "latitude": self.latitude,
            "longitude": self.longitude,
            "price_per_month": self.price_per_month,
            "deposit": self.deposit,
            "bedrooms": self.bedrooms,
            "bathrooms": self.bathrooms,
            "max_occupants": self.max_occupants,
            "available_from": self.available_from,
            "available_to": self.available_to,
            "university_id": self.university_id,
        })
    }
}

impl From<&PropertyListing> for PropertyDraft {
    fn from(listing: &PropertyListing) -> Self {
        let property = &listing.property;
        Self {
            title: property.title.clone(),
            description: property.description.clone(),
            address: property.address.clone(),
            city: property.city.clone(),
            latitude: property.latitude,
            longitude: property.longitude,
            price_per_month: property.price_per_month,
            deposit: property.deposit,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            max_occupants: property.max_occupants,
            available_from: property.available_from,
            available_to: property.available_to,
            university_id: property.university_id.clone(),
            image_urls: listing.images.iter().map(|image| image.url.clone()).collect(),
            amenity_ids: listing.amenities.iter().map(|amenity| amenity.id.clone()).collect(),
        }
    }
}
