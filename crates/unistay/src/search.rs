use serde::{Deserialize, Serialize};

use crate::domain::{AmenityId, Property, PropertyListing, UniversityId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
    TopRated,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" => Some(Self::Newest),
            "price_asc" | "price_low_to_high" => Some(Self::PriceLowToHigh),
            "price_desc" | "price_high_to_low" => Some(Self::PriceHighToLow),
            "rating" | "top_rated" => Some(Self::TopRated),
            _ => None,
        }
    }
}

/// Case-insensitive substring match on title, city, or address. A blank
/// query matches everything.
pub fn matches_query(property: &Property, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&property.title, &property.city, &property.address]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn search_properties(properties: &[Property], query: &str) -> Vec<Property> {
    properties
        .iter()
        .filter(|property| matches_query(property, query))
        .cloned()
        .collect()
}

/// Browse-screen filter applied to listings already fetched from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub query: String,
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u8>,
    pub university_id: Option<UniversityId>,
    pub amenity_ids: Vec<AmenityId>,
    pub sort: SortOrder,
}

impl PropertyFilter {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, listing: &PropertyListing) -> bool {
        let property = &listing.property;
        matches_query(property, &self.query)
            && self
                .city
                .as_deref()
                .map_or(true, |city| property.city.eq_ignore_ascii_case(city.trim()))
            && self
                .min_price
                .map_or(true, |min| property.price_per_month >= min)
            && self
                .max_price
                .map_or(true, |max| property.price_per_month <= max)
            && self
                .min_bedrooms
                .map_or(true, |beds| property.bedrooms >= beds)
            && self
                .university_id
                .as_ref()
                .map_or(true, |uni| property.university_id.as_ref() == Some(uni))
            && self
                .amenity_ids
                .iter()
                .all(|amenity| listing.has_amenity(amenity))
    }

    pub fn apply(&self, listings: &[PropertyListing]) -> Vec<PropertyListing> {
        let mut visible: Vec<PropertyListing> = listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect();

        match self.sort {
            SortOrder::Newest => visible.sort_by(|a, b| b.property.created_at.cmp(&a.property.created_at)),
            SortOrder::PriceLowToHigh => visible.sort_by(|a, b| {
                a.property
                    .price_per_month
                    .total_cmp(&b.property.price_per_month)
            }),
            SortOrder::PriceHighToLow => visible.sort_by(|a, b| {
                b.property
                    .price_per_month
                    .total_cmp(&a.property.price_per_month)
            }),
            SortOrder::TopRated => visible.sort_by(|a, b| {
                b.property
                    .rating
                    .total_cmp(&a.property.rating)
                    .then(b.property.review_count.cmp(&a.property.review_count))
            }),
        }
        visible
    }
}
