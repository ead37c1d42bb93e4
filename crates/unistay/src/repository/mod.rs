//! Typed access to the marketplace tables.
//!
//! Each repository owns one concern (users, bookings, reviews, ...) and maps
//! backend rows to domain values. All of them share one
//! [`SharedDataService`], so swapping the hosted backend for the in-memory
//! one swaps it everywhere.

mod admin;
mod bookings;
mod catalog;
mod favorites;
mod landlords;
mod properties;
mod reviews;
mod students;
mod users;

pub use admin::{AdminRepository, AdminStats, BookingExportRow, BookingStatusCount, ExportError};
pub use bookings::BookingRepository;
pub use catalog::CatalogRepository;
pub use favorites::FavoriteRepository;
pub use landlords::LandlordRepository;
pub use properties::PropertyRepository;
pub use reviews::ReviewRepository;
pub use students::StudentRepository;
pub use users::UserRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::availability::MalformedDatePolicy;
use crate::backend::{
    decode_row, decode_rows, encode_row, BackendError, DataService, Filter, Query,
    SharedDataService, Table,
};
use crate::domain::UserId;
use crate::ratings::RatingAggregator;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Map a unique-constraint rejection to `Conflict` with a readable message.
    pub(crate) fn conflict_or_backend(err: BackendError, message: &str) -> Self {
        if err.is_conflict() {
            Self::Conflict(message.to_string())
        } else {
            Self::Backend(err)
        }
    }
}

/// Every repository over one backend handle.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub students: StudentRepository,
    pub landlords: LandlordRepository,
    pub properties: PropertyRepository,
    pub bookings: BookingRepository,
    pub reviews: ReviewRepository,
    pub favorites: FavoriteRepository,
    pub catalog: CatalogRepository,
    pub admin: AdminRepository,
}

impl Repositories {
    /// Spawns the rating aggregator, so this must run inside a tokio runtime.
    pub fn new(service: SharedDataService, policy: MalformedDatePolicy) -> Self {
        let ratings = RatingAggregator::spawn(service.clone());
        Self {
            users: UserRepository::new(service.clone()),
            students: StudentRepository::new(service.clone()),
            landlords: LandlordRepository::new(service.clone()),
            properties: PropertyRepository::new(service.clone()),
            bookings: BookingRepository::new(service.clone(), policy),
            reviews: ReviewRepository::new(service.clone(), ratings.clone()),
            favorites: FavoriteRepository::new(service.clone()),
            catalog: CatalogRepository::new(service.clone()),
            admin: AdminRepository::new(service, ratings, policy),
        }
    }
}

pub(crate) async fn fetch_all<T: DeserializeOwned>(
    service: &dyn DataService,
    query: Query,
) -> Result<Vec<T>, RepositoryError> {
    let rows = service.select(query).await?;
    Ok(decode_rows(rows)?)
}

pub(crate) async fn fetch_optional<T: DeserializeOwned>(
    service: &dyn DataService,
    query: Query,
) -> Result<Option<T>, RepositoryError> {
    let rows = service.select(query.limit(1)).await?;
    match rows.into_iter().next() {
        Some(row) => Ok(Some(decode_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn fetch_one<T: DeserializeOwned>(
    service: &dyn DataService,
    query: Query,
) -> Result<T, RepositoryError> {
    let entity = query.table.name();
    fetch_optional(service, query)
        .await?
        .ok_or(RepositoryError::NotFound { entity })
}

/// Patch the rows matching `filter` and decode the first one back.
pub(crate) async fn update_one<T, P>(
    service: &dyn DataService,
    table: Table,
    filter: Filter,
    patch: &P,
) -> Result<T, RepositoryError>
where
    T: DeserializeOwned,
    P: Serialize,
{
    let rows = service.update(table, filter, encode_row(patch)?).await?;
    match rows.into_iter().next() {
        Some(row) => Ok(decode_row(row)?),
        None => Err(RepositoryError::NotFound {
            entity: table.name(),
        }),
    }
}

pub(crate) async fn mark_profile_completed(
    service: &dyn DataService,
    user_id: &UserId,
) -> Result<(), RepositoryError> {
    let rows = service
        .update(
            Table::Users,
            Filter::eq("id", user_id),
            encode_row(&json!({ "profile_completed": true }))?,
        )
        .await?;
    if rows.is_empty() {
        return Err(RepositoryError::NotFound { entity: "users" });
    }
    Ok(())
}
