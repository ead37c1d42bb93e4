use serde::{Deserialize, Serialize};

use crate::domain::Property;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance in kilometres (haversine).
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyProperty {
    pub property: Property,
    pub distance_km: f64,
}

/// Every located property with its distance from `origin`, nearest first.
/// Properties without coordinates are dropped.
pub fn distances_from(origin: GeoPoint, properties: &[Property]) -> Vec<NearbyProperty> {
    let mut nearby: Vec<NearbyProperty> = properties
        .iter()
        .filter_map(|property| {
            property.location().map(|location| NearbyProperty {
                property: property.clone(),
                distance_km: haversine_km(origin, location),
            })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Properties no further than `max_km` from `origin`, nearest first.
pub fn within_radius(origin: GeoPoint, properties: &[Property], max_km: f64) -> Vec<NearbyProperty> {
    distances_from(origin, properties)
        .into_iter()
        .take_while(|nearby| nearby.distance_km <= max_km)
        .collect()
}
