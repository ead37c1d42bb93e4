use super::{Feedback, StateHolder, ViewError};
use crate::domain::{Property, University, UniversityId};
use crate::geo::{within_radius, NearbyProperty};
use crate::repository::Repositories;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct MapState {
    pub feedback: Feedback,
    pub universities: Vec<University>,
    pub properties: Vec<Property>,
    pub selected_university: Option<University>,
    pub max_distance_km: f64,
    pub nearby: Vec<NearbyProperty>,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            feedback: Feedback::default(),
            universities: Vec::new(),
            properties: Vec::new(),
            selected_university: None,
            max_distance_km: DEFAULT_RADIUS_KM,
            nearby: Vec::new(),
        }
    }
}

/// Listings around a chosen university.
pub struct MapViewModel {
    repos: Repositories,
    state: StateHolder<MapState>,
}

impl MapViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("map", MapState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<MapState> {
        &self.state
    }

    pub async fn load(&self) {
        let loaded = self
            .state
            .run("load", async {
                let universities = self.repos.catalog.universities().await?;
                let properties = self.repos.properties.list_active().await?;
                Ok::<_, ViewError>((universities, properties))
            })
            .await;

        if let Some((universities, properties)) = loaded {
            self.state.update(|state| {
                state.universities = universities;
                state.properties = properties;
                refresh_nearby(state);
            });
        }
    }

    pub fn select_university(&self, id: &UniversityId) {
        self.state.update(|state| {
            let selected = state
                .universities
                .iter()
                .find(|university| &university.id == id)
                .cloned();
            if selected.is_none() {
                state.feedback.error_message = Some("Unknown university".to_string());
            }
            state.selected_university = selected;
            refresh_nearby(state);
        });
    }

    /// Non-positive or non-finite radii are ignored.
    pub fn set_max_distance(&self, km: f64) {
        if !km.is_finite() || km <= 0.0 {
            return;
        }
        self.state.update(|state| {
            state.max_distance_km = km;
            refresh_nearby(state);
        });
    }
}

fn refresh_nearby(state: &mut MapState) {
    state.nearby = match &state.selected_university {
        Some(university) => {
            within_radius(university.location(), &state.properties, state.max_distance_km)
        }
        None => Vec::new(),
    };
}

screen_state!(MapState);
