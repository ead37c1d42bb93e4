use std::io::Write;

use super::{Feedback, StateHolder, ViewError};
use crate::domain::{
    Landlord, LandlordId, Property, PropertyId, Review, ReviewId, User, UserId, UserRole,
};
use crate::repository::{AdminStats, ExportError, Repositories};
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct AdminDashboardState {
    pub feedback: Feedback,
    pub stats: Option<AdminStats>,
    pub users: Vec<User>,
    pub landlords: Vec<Landlord>,
    pub properties: Vec<Property>,
    pub reviews: Vec<Review>,
}

type Snapshot = (AdminStats, Vec<User>, Vec<Landlord>, Vec<Property>, Vec<Review>);

/// Moderation console. Every operation re-checks the admin role.
pub struct AdminDashboardViewModel {
    repos: Repositories,
    state: StateHolder<AdminDashboardState>,
}

impl AdminDashboardViewModel {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            state: StateHolder::new("admin_dashboard", AdminDashboardState::default()),
        }
    }

    pub fn state(&self) -> &StateHolder<AdminDashboardState> {
        &self.state
    }

    pub async fn load(&self, session: &Session) {
        if let Some(snapshot) = self.state.run("load", self.fetch(session)).await {
            self.publish(snapshot);
        }
    }

    async fn fetch(&self, session: &Session) -> Result<Snapshot, ViewError> {
        session.require_role(UserRole::Admin)?;
        let admin = &self.repos.admin;
        Ok((
            admin.dashboard().await?,
            admin.users(None).await?,
            admin.landlords().await?,
            admin.properties().await?,
            admin.reviews().await?,
        ))
    }

    fn publish(&self, (stats, users, landlords, properties, reviews): Snapshot) {
        self.state.update(|state| {
            state.stats = Some(stats);
            state.users = users;
            state.landlords = landlords;
            state.properties = properties;
            state.reviews = reviews;
        });
    }

    pub async fn set_landlord_verified(
        &self,
        session: &Session,
        id: &LandlordId,
        verified: bool,
    ) {
        let refreshed = self
            .state
            .run("set_landlord_verified", async {
                session.require_role(UserRole::Admin)?;
                self.repos.admin.set_landlord_verified(id, verified).await?;
                self.fetch(session).await
            })
            .await;
        self.finish(
            refreshed,
            if verified { "Landlord verified" } else { "Verification removed" },
        );
    }

    pub async fn set_property_active(&self, session: &Session, id: &PropertyId, active: bool) {
        let refreshed = self
            .state
            .run("set_property_active", async {
                session.require_role(UserRole::Admin)?;
                self.repos.admin.set_property_active(id, active).await?;
                self.fetch(session).await
            })
            .await;
        self.finish(
            refreshed,
            if active { "Listing published" } else { "Listing hidden" },
        );
    }

    pub async fn delete_user(&self, session: &Session, id: &UserId) {
        let refreshed = self
            .state
            .run("delete_user", async {
                session.require_role(UserRole::Admin)?;
                if id == &session.user_id {
                    return Err(ViewError::invalid("You cannot delete your own account"));
                }
                self.repos.admin.delete_user(id).await?;
                self.fetch(session).await
            })
            .await;
        self.finish(refreshed, "User deleted");
    }

    pub async fn delete_review(&self, session: &Session, id: &ReviewId) {
        let refreshed = self
            .state
            .run("delete_review", async {
                session.require_role(UserRole::Admin)?;
                self.repos.admin.delete_review(id).await?;
                self.fetch(session).await
            })
            .await;
        self.finish(refreshed, "Review deleted");
    }

    /// Bookings as CSV into `writer`; returns how many rows were written.
    pub async fn export_bookings<W: Write>(&self, session: &Session, writer: W) -> Option<usize> {
        let rows = self
            .state
            .run("export_bookings", async {
                session.require_role(UserRole::Admin)?;
                self.repos
                    .admin
                    .export_bookings_csv(writer)
                    .await
                    .map_err(|err| match err {
                        ExportError::Repository(err) => ViewError::Repository(err),
                        other => ViewError::invalid(format!("Export failed: {other}")),
                    })
            })
            .await?;
        self.state.succeed(format!("Exported {rows} bookings"));
        Some(rows)
    }

    fn finish(&self, refreshed: Option<Snapshot>, success: &'static str) {
        if let Some(snapshot) = refreshed {
            self.publish(snapshot);
            self.state.succeed(success);
        }
    }
}

screen_state!(AdminDashboardState);

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{BookingStatus, NewUser};
    use crate::repository::fixtures::{marketplace, Marketplace};
    use crate::viewmodel::auth::open_session;
    use crate::viewmodel::fixtures;

    async fn admin(market: &Marketplace) -> Session {
        let user = market
            .repos
            .users
            .register(&NewUser::new("root@unistay.app", "Site Admin", UserRole::Admin))
            .await
            .expect("admin");
        open_session(&market.repos, &user).await.expect("session")
    }

    #[tokio::test]
    async fn dashboard_counts_and_moderation() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let session = admin(&market).await;
        let screen = AdminDashboardViewModel::new(market.repos.clone());

        screen.load(&session).await;
        let stats = screen.state().snapshot().stats.expect("stats");
        assert_eq!(stats.students, 1);
        assert_eq!(stats.landlords, 1);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.unverified_landlords, 1);
        assert_eq!(stats.properties_active, 1);

        screen.set_landlord_verified(&session, &market.landlord, true).await;
        let state = screen.state().snapshot();
        assert_eq!(state.stats.map(|stats| stats.unverified_landlords), Some(0));
        assert!(state.landlords[0].verified);

        screen
            .set_property_active(&session, &listing.property.id, false)
            .await;
        let stats = screen.state().snapshot().stats.expect("stats");
        assert_eq!(stats.properties_active, 0);
        assert_eq!(stats.properties_total, 1);
    }

    #[tokio::test]
    async fn deleting_a_landlord_hides_their_listings() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let session = admin(&market).await;
        let landlord_user = fixtures::landlord(&market).await.user_id;
        let screen = AdminDashboardViewModel::new(market.repos.clone());

        screen.delete_user(&session, &landlord_user).await;
        assert_eq!(
            screen.state().snapshot().feedback.success_message.as_deref(),
            Some("User deleted")
        );
        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property kept");
        assert!(!property.is_active);

        screen.delete_user(&session, &session.user_id).await;
        assert_eq!(
            screen.state().snapshot().feedback.error_message.as_deref(),
            Some("You cannot delete your own account")
        );
    }

    #[tokio::test]
    async fn export_writes_csv() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let day = |d| NaiveDate::from_ymd_opt(2030, 2, d).expect("valid date");
        market
            .repos
            .bookings
            .request(&listing.property, &market.student, day(1), day(16), None, day(1))
            .await
            .expect("requested");
        let session = admin(&market).await;
        let screen = AdminDashboardViewModel::new(market.repos.clone());

        let mut out = Vec::new();
        assert_eq!(screen.export_bookings(&session, &mut out).await, Some(1));
        let csv = String::from_utf8(out).expect("utf8");
        assert!(csv.starts_with("booking_id,"));
        assert!(csv.contains("ana@uni.edu"));

        screen.load(&session).await;
        let stats = screen.state().snapshot().stats.expect("stats");
        assert_eq!(stats.bookings_with_status(BookingStatus::Pending), 1);
    }

    #[tokio::test]
    async fn non_admins_are_refused() {
        let market = marketplace().await;
        let session = fixtures::student(&market).await;
        let screen = AdminDashboardViewModel::new(market.repos.clone());

        screen.load(&session).await;
        let state = screen.state().snapshot();
        assert!(state.stats.is_none());
        assert_eq!(
            state.feedback.error_message.as_deref(),
            Some("Only admin accounts can do this")
        );
        assert_eq!(screen.export_bookings(&session, Vec::<u8>::new()).await, None);
    }
}
