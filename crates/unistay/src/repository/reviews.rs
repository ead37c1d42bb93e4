use tracing::{info, warn};

use super::{fetch_all, fetch_one, fetch_optional, RepositoryError};
use crate::backend::{decode_row, decode_rows, encode_row, Filter, Query, SharedDataService, Table};
use crate::domain::{
    Booking, BookingId, BookingStatus, LandlordId, NewReview, Property, PropertyId, Review,
    ReviewId, ReviewSubmission, StudentId,
};
use crate::ratings::{RatingAggregator, RatingTarget};

#[derive(Clone)]
pub struct ReviewRepository {
    service: SharedDataService,
    ratings: RatingAggregator,
}

impl ReviewRepository {
    pub fn new(service: SharedDataService, ratings: RatingAggregator) -> Self {
        Self { service, ratings }
    }

    pub async fn for_property(&self, id: &PropertyId) -> Result<Vec<Review>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Reviews)
                .filter(Filter::eq("property_id", id))
                .order_by("created_at", true),
        )
        .await
    }

    pub async fn for_landlord(&self, id: &LandlordId) -> Result<Vec<Review>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Reviews)
                .filter(Filter::eq("landlord_id", id))
                .order_by("created_at", true),
        )
        .await
    }

    pub async fn for_student(&self, id: &StudentId) -> Result<Vec<Review>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Reviews).filter(Filter::eq("student_id", id)),
        )
        .await
    }

    pub async fn for_booking(&self, id: &BookingId) -> Result<Option<Review>, RepositoryError> {
        fetch_optional(
            self.service.as_ref(),
            Query::table(Table::Reviews).filter(Filter::eq("booking_id", id)),
        )
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Review>, RepositoryError> {
        fetch_all(
            self.service.as_ref(),
            Query::table(Table::Reviews).order_by("created_at", true),
        )
        .await
    }

    /// Store a review for a completed stay, then refresh the property and
    /// landlord aggregates.
    pub async fn submit(&self, submission: &ReviewSubmission) -> Result<Review, RepositoryError> {
        submission.validate().map_err(RepositoryError::Validation)?;

        let booking: Booking = fetch_one(
            self.service.as_ref(),
            Query::table(Table::Bookings).filter(Filter::eq("id", &submission.booking_id)),
        )
        .await?;
        if booking.student_id != submission.student_id {
            return Err(RepositoryError::Validation(
                "You can only review your own stays".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(RepositoryError::Validation(
                "Only completed stays can be reviewed".to_string(),
            ));
        }
        if self.for_booking(&booking.id).await?.is_some() {
            return Err(RepositoryError::Conflict(
                "This stay has already been reviewed".to_string(),
            ));
        }

        let property: Property = fetch_one(
            self.service.as_ref(),
            Query::table(Table::Properties).filter(Filter::eq("id", &booking.property_id)),
        )
        .await?;
        let review = NewReview {
            booking_id: booking.id.clone(),
            property_id: property.id.clone(),
            student_id: submission.student_id.clone(),
            landlord_id: property.landlord_id.clone(),
            property_rating: submission.property_rating,
            landlord_rating: submission.landlord_rating,
            comment: submission.normalized_comment(),
        };
        let row = self
            .service
            .insert(Table::Reviews, encode_row(&review)?)
            .await
            .map_err(|err| {
                RepositoryError::conflict_or_backend(err, "This stay has already been reviewed")
            })?;
        let review: Review = decode_row(row)?;
        info!(review_id = %review.id, booking_id = %review.booking_id, "review submitted");

        self.refresh(&review, false).await?;
        Ok(review)
    }

    /// Remove a review and refresh the aggregates it contributed to.
    pub async fn delete(&self, id: &ReviewId) -> Result<Review, RepositoryError> {
        let removed = self
            .service
            .delete(Table::Reviews, Filter::eq("id", id))
            .await?;
        let review: Review = match decode_rows(removed)?.into_iter().next() {
            Some(review) => review,
            None => return Err(RepositoryError::NotFound { entity: "reviews" }),
        };
        info!(review_id = %id, "review deleted");

        self.refresh(&review, true).await?;
        Ok(review)
    }

    async fn refresh(&self, review: &Review, after_removal: bool) -> Result<(), RepositoryError> {
        let targets = [
            RatingTarget::Property(review.property_id.clone()),
            RatingTarget::Landlord(review.landlord_id.clone()),
        ];
        for target in targets {
            let landlord = matches!(target, RatingTarget::Landlord(_));
            let outcome = if after_removal {
                self.ratings.recompute_after_removal(target).await
            } else {
                self.ratings.recompute(target).await
            };
            match outcome {
                Ok(_) => {}
                // Deleted landlord accounts keep their deactivated listings.
                Err(RepositoryError::NotFound { .. }) if landlord => {
                    warn!(
                        review_id = %review.id,
                        landlord_id = %review.landlord_id,
                        "landlord profile missing, landlord rating not updated"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::backend::{BackendError, DataService, MemoryDataService, Row};
    use crate::domain::{Landlord, PropertyListing};
    use crate::repository::fixtures::{marketplace, marketplace_over, Marketplace};

    /// Hands control back to the scheduler after every read, so a
    /// read-then-write sequence can interleave with other tasks.
    struct YieldingReads(MemoryDataService);

    #[async_trait]
    impl DataService for YieldingReads {
        async fn select(&self, query: Query) -> Result<Vec<Row>, BackendError> {
            let rows = self.0.select(query).await?;
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            Ok(rows)
        }

        async fn insert(&self, table: Table, row: Row) -> Result<Row, BackendError> {
            self.0.insert(table, row).await
        }

        async fn update(
            &self,
            table: Table,
            filter: Filter,
            patch: Row,
        ) -> Result<Vec<Row>, BackendError> {
            self.0.update(table, filter, patch).await
        }

        async fn delete(&self, table: Table, filter: Filter) -> Result<Vec<Row>, BackendError> {
            self.0.delete(table, filter).await
        }
    }

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, month, day).expect("valid date")
    }

    async fn completed_stay(market: &Marketplace, listing: &PropertyListing, start: u32) -> Booking {
        let bookings = &market.repos.bookings;
        let booking = bookings
            .request(
                &listing.property,
                &market.student,
                day(3, start),
                day(3, start + 2),
                None,
                day(1, 1),
            )
            .await
            .expect("requested");
        bookings
            .update_status(&booking.id, BookingStatus::Approved)
            .await
            .expect("approved");
        bookings
            .update_status(&booking.id, BookingStatus::Completed)
            .await
            .expect("completed")
    }

    fn submission(market: &Marketplace, booking: &Booking, stars: u8) -> ReviewSubmission {
        ReviewSubmission {
            booking_id: booking.id.clone(),
            student_id: market.student.clone(),
            property_rating: stars,
            landlord_rating: 4,
            comment: Some("Quiet and close to campus".to_string()),
        }
    }

    #[tokio::test]
    async fn reviews_update_property_and_landlord_aggregates() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let reviews = &market.repos.reviews;

        for (start, stars) in [(1, 5), (5, 3), (9, 4)] {
            let stay = completed_stay(&market, &listing, start).await;
            reviews
                .submit(&submission(&market, &stay, stars))
                .await
                .expect("review stored");
        }

        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property");
        assert_eq!(property.rating, 4.0);
        assert_eq!(property.review_count, 3);

        let landlord: Landlord = market
            .repos
            .landlords
            .get(&market.landlord)
            .await
            .expect("landlord");
        assert_eq!(landlord.rating, 4.0);
        assert_eq!(landlord.review_count, 3);
    }

    #[tokio::test]
    async fn second_review_for_a_stay_is_refused() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let stay = completed_stay(&market, &listing, 1).await;

        market
            .repos
            .reviews
            .submit(&submission(&market, &stay, 5))
            .await
            .expect("first review");
        let again = market.repos.reviews.submit(&submission(&market, &stay, 1)).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn only_completed_stays_of_the_author_can_be_reviewed() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let pending = market
            .repos
            .bookings
            .request(&listing.property, &market.student, day(4, 1), day(4, 3), None, day(1, 1))
            .await
            .expect("requested");

        let early = market.repos.reviews.submit(&submission(&market, &pending, 5)).await;
        assert!(matches!(early, Err(RepositoryError::Validation(_))));

        let stay = completed_stay(&market, &listing, 1).await;
        let mut forged = submission(&market, &stay, 5);
        forged.student_id = StudentId::new("stu-other");
        let result = market.repos.reviews.submit(&forged).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn deleting_the_last_review_resets_the_aggregate() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let stay = completed_stay(&market, &listing, 1).await;
        let review = market
            .repos
            .reviews
            .submit(&submission(&market, &stay, 2))
            .await
            .expect("review stored");

        market.repos.reviews.delete(&review.id).await.expect("deleted");
        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property");
        assert_eq!(property.rating, 0.0);
        assert_eq!(property.review_count, 0);
    }

    #[tokio::test]
    async fn concurrent_reviews_are_both_counted() {
        let market =
            marketplace_over(|store| Arc::new(YieldingReads(store)) as SharedDataService).await;
        let listing = market.listing().await;
        let first = completed_stay(&market, &listing, 1).await;
        let second = completed_stay(&market, &listing, 5).await;

        let reviews = &market.repos.reviews;
        let first_review = submission(&market, &first, 5);
        let second_review = submission(&market, &second, 2);
        let (left, right) = tokio::join!(
            reviews.submit(&first_review),
            reviews.submit(&second_review),
        );
        left.expect("first review stored");
        right.expect("second review stored");

        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property");
        assert_eq!(property.review_count, 2);
        assert_eq!(property.rating, 3.5);

        let landlord = market
            .repos
            .landlords
            .get(&market.landlord)
            .await
            .expect("landlord");
        assert_eq!(landlord.review_count, 2);
        assert_eq!(landlord.rating, 4.0);
    }

    #[tokio::test]
    async fn stays_with_a_deleted_landlord_can_still_be_reviewed() {
        let market = marketplace().await;
        let listing = market.listing().await;
        let stay = completed_stay(&market, &listing, 1).await;
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
            .expect("landlord deleted");

        let review = market
            .repos
            .reviews
            .submit(&submission(&market, &stay, 4))
            .await
            .expect("review stored");
        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property");
        assert_eq!((property.rating, property.review_count), (4.0, 1));

        market.repos.reviews.delete(&review.id).await.expect("review removed");
        let property = market
            .repos
            .properties
            .get(&listing.property.id)
            .await
            .expect("property");
        assert_eq!(property.review_count, 0);
    }
}
