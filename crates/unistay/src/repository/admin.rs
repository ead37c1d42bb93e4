use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;
use tracing::{info, warn};

use super::{
    BookingRepository, FavoriteRepository, LandlordRepository, PropertyRepository,
    RepositoryError, ReviewRepository, StudentRepository, UserRepository,
};
use crate::availability::MalformedDatePolicy;
use crate::backend::SharedDataService;
use crate::domain::{
    BookingStatus, Landlord, LandlordId, Property, PropertyId, Review, ReviewId, User, UserId,
    UserRole,
};
use crate::ratings::RatingAggregator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingStatusCount {
    pub status: BookingStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Marketplace-wide counters for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub students: usize,
    pub landlords: usize,
    pub admins: usize,
    pub unverified_landlords: usize,
    pub properties_total: usize,
    pub properties_active: usize,
    pub bookings_total: usize,
    pub bookings_by_status: Vec<BookingStatusCount>,
    pub reviews: usize,
}

impl AdminStats {
    pub fn bookings_with_status(&self, status: BookingStatus) -> usize {
        self.bookings_by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

/// One line of the bookings CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingExportRow {
    pub booking_id: String,
    pub property_id: String,
    pub property_title: String,
    pub student_id: String,
    pub student_email: String,
    pub start_date: String,
    pub end_date: String,
    pub status: &'static str,
    pub total_price: f64,
    pub created_at: String,
}

/// Moderation operations across every table.
#[derive(Clone)]
pub struct AdminRepository {
    users: UserRepository,
    students: StudentRepository,
    landlords: LandlordRepository,
    properties: PropertyRepository,
    bookings: BookingRepository,
    reviews: ReviewRepository,
    favorites: FavoriteRepository,
}

impl AdminRepository {
    pub fn new(
        service: SharedDataService,
        ratings: RatingAggregator,
        policy: MalformedDatePolicy,
    ) -> Self {
        Self {
            users: UserRepository::new(service.clone()),
            students: StudentRepository::new(service.clone()),
            landlords: LandlordRepository::new(service.clone()),
            properties: PropertyRepository::new(service.clone()),
            bookings: BookingRepository::new(service.clone(), policy),
            reviews: ReviewRepository::new(service.clone(), ratings),
            favorites: FavoriteRepository::new(service),
        }
    }

    pub async fn dashboard(&self) -> Result<AdminStats, RepositoryError> {
        let users = self.users.list(None).await?;
        let landlords = self.landlords.list(None).await?;
        let properties = self.properties.list_all().await?;
        let bookings = self.bookings.list_all().await?;
        let reviews = self.reviews.list_all().await?;

        let count_role = |role: UserRole| users.iter().filter(|user| user.role == role).count();
        let bookings_by_status = BookingStatus::ordered()
            .into_iter()
            .map(|status| BookingStatusCount {
                status,
                status_label: status.label(),
                count: bookings.iter().filter(|booking| booking.status == status).count(),
            })
            .collect();

        Ok(AdminStats {
            students: count_role(UserRole::Student),
            landlords: count_role(UserRole::Landlord),
            admins: count_role(UserRole::Admin),
            unverified_landlords: landlords.iter().filter(|landlord| !landlord.verified).count(),
            properties_total: properties.len(),
            properties_active: properties.iter().filter(|property| property.is_active).count(),
            bookings_total: bookings.len(),
            bookings_by_status,
            reviews: reviews.len(),
        })
    }

    pub async fn users(&self, role: Option<UserRole>) -> Result<Vec<User>, RepositoryError> {
        self.users.list(role).await
    }

    pub async fn landlords(&self) -> Result<Vec<Landlord>, RepositoryError> {
        self.landlords.list(None).await
    }

    pub async fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        self.properties.list_all().await
    }

    pub async fn reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        self.reviews.list_all().await
    }

    pub async fn set_landlord_verified(
        &self,
        id: &LandlordId,
        verified: bool,
    ) -> Result<Landlord, RepositoryError> {
        self.landlords.set_verified(id, verified).await
    }

    pub async fn set_property_active(
        &self,
        id: &PropertyId,
        active: bool,
    ) -> Result<Property, RepositoryError> {
        self.properties.set_active(id, active).await
    }

    /// Remove an account. Favorites and profile rows go first; a landlord's
    /// listings are deactivated rather than deleted so booking history stays
    /// readable.
    pub async fn delete_user(&self, id: &UserId) -> Result<(), RepositoryError> {
        let user = self.users.get(id).await?;
        match user.role {
            UserRole::Student => {
                if let Some(profile) = self.students.by_user(id).await? {
                    let favorites = self.favorites.delete_for_student(&profile.id).await?;
                    info!(student_id = %profile.id, favorites, "student favorites removed");
                }
                self.students.delete_for_user(id).await?;
            }
            UserRole::Landlord => {
                if let Some(landlord) = self.landlords.by_user(id).await? {
                    let listings = self.properties.deactivate_for_landlord(&landlord.id).await?;
                    info!(landlord_id = %landlord.id, listings, "landlord listings deactivated");
                }
                self.landlords.delete_for_user(id).await?;
            }
            UserRole::Admin => {}
        }
        self.users.delete(id).await
    }

    pub async fn delete_review(&self, id: &ReviewId) -> Result<Review, RepositoryError> {
        self.reviews.delete(id).await
    }

    /// Write every booking as CSV, newest first; returns the row count.
    pub async fn export_bookings_csv<W: Write>(&self, writer: W) -> Result<usize, ExportError> {
        let bookings = self.bookings.list_all().await?;
        let titles: HashMap<PropertyId, String> = self
            .properties
            .list_all()
            .await?
            .into_iter()
            .map(|property| (property.id, property.title))
            .collect();
        let students = self.students.list().await?;
        let emails: HashMap<UserId, String> = self
            .users
            .list(Some(UserRole::Student))
            .await?
            .into_iter()
            .map(|user| (user.id, user.email))
            .collect();
        let student_email = |student_id: &str| -> String {
            students
                .iter()
                .find(|profile| profile.id.as_str() == student_id)
                .and_then(|profile| emails.get(&profile.user_id))
                .cloned()
                .unwrap_or_default()
        };

        let mut csv_writer = csv::Writer::from_writer(writer);
        for booking in &bookings {
            let property_title = titles.get(&booking.property_id).cloned().unwrap_or_else(|| {
                warn!(booking_id = %booking.id, "booking references a missing property");
                String::new()
            });
            csv_writer.serialize(BookingExportRow {
                booking_id: booking.id.to_string(),
                property_id: booking.property_id.to_string(),
                property_title,
                student_id: booking.student_id.to_string(),
                student_email: student_email(booking.student_id.as_str()),
                start_date: booking.start_date.clone(),
                end_date: booking.end_date.clone(),
                status: booking.status.as_str(),
                total_price: booking.total_price,
                created_at: booking
                    .created_at
                    .map(|created| created.to_rfc3339())
                    .unwrap_or_default(),
            })?;
        }
        csv_writer.flush()?;
        info!(rows = bookings.len(), "bookings exported");
        Ok(bookings.len())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("could not write export: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not write export: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use std::sync::Arc;

    use super::*;
    use crate::backend::{MemoryDataService, Table};
    use crate::domain::NewUser;
    use crate::repository::fixtures::marketplace;
    use crate::repository::Repositories;

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn dashboard_counts_roles_listings_and_bookings() {
        let market = marketplace().await;
        let listing = market.listing().await;
        market
            .repos
            .users
            .register(&NewUser::new("ops@unistay.app", "Ops", UserRole::Admin))
            .await
            .expect("admin");
        market
            .repos
            .bookings
            .request(&listing.property, &market.student, day(5, 1), day(5, 8), None, day(1, 1))
            .await
            .expect("booking");

        let stats = market.repos.admin.dashboard().await.expect("stats");
        assert_eq!((stats.students, stats.landlords, stats.admins), (1, 1, 1));
        assert_eq!(stats.unverified_landlords, 1);
        assert_eq!((stats.properties_total, stats.properties_active), (1, 1));
        assert_eq!(stats.bookings_with_status(BookingStatus::Pending), 1);
        assert_eq!(stats.bookings_with_status(BookingStatus::Approved), 0);
        assert_eq!(stats.reviews, 0);
    }

    #[tokio::test]
    async fn deleting_a_landlord_deactivates_listings() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let landlord = market
            .repos
            .landlords
            .get(&market.landlord)
            .await
            .expect("landlord");

        market
            .repos
            .admin
            .delete_user(&landlord.user_id)
            .await
            .expect("deleted");

        assert_eq!(market.store.count(Table::Landlords), 0);
        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property kept");
        assert!(!property.is_active);
    }

    #[tokio::test]
    async fn deleting_a_student_removes_favorites_first() {
        let market = marketplace().await;
        let listing = market.listing().await;
        market
            .repos
            .favorites
            .add(&market.student, &listing.property.id)
            .await
            .expect("favorite");
        let student = market.repos.students.get(&market.student).await.expect("student");

        market
            .repos
            .admin
            .delete_user(&student.user_id)
            .await
            .expect("deleted");
        assert_eq!(market.store.count(Table::Favorites), 0);
        assert_eq!(market.store.count(Table::Students), 0);
        assert!(market.repos.users.get(&student.user_id).await.is_err());
    }

    #[tokio::test]
    async fn export_writes_a_header_and_one_line_per_booking() {
        let market = marketplace().await;
        let listing = market.listing().await;
        market
            .repos
            .bookings
            .request(&listing.property, &market.student, day(5, 1), day(5, 16), None, day(1, 1))
            .await
            .expect("booking");

        let mut buffer = Vec::new();
        let rows = market
            .repos
            .admin
            .export_bookings_csv(&mut buffer)
            .await
            .expect("exported");
        assert_eq!(rows, 1);

        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("booking_id,property_id,property_title,student_id,student_email,start_date,end_date,status,total_price,created_at")
        );
        let line = lines.next().expect("booking line");
        assert!(line.contains("Bright room near campus"));
        assert!(line.contains("ana@uni.edu"));
        assert!(line.contains(",pending,300.0,"));
    }

    #[tokio::test]
    async fn admin_bookings_use_the_configured_date_policy() {
        let repos = Repositories::new(
            Arc::new(MemoryDataService::new()),
            MalformedDatePolicy::Block,
        );
        assert_eq!(repos.admin.bookings.policy(), MalformedDatePolicy::Block);
    }
}
