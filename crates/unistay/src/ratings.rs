//! Aggregate star ratings for properties and landlords.
//!
//! The aggregate is the plain mean of every review's rating for the target.
//! Recomputation reads all reviews, computes the mean and writes it back, so
//! concurrent recomputations of the same row must not interleave. Callers
//! therefore go through [`RatingAggregator`], whose single background task
//! processes one request at a time.

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::{
    decode_rows, encode_row, DataService, Filter, Query, SharedDataService, Table,
};
use crate::domain::{LandlordId, PropertyId, Review};
use crate::repository::RepositoryError;

const QUEUE_DEPTH: usize = 64;

/// Running sum and count of 1-5 star ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingTally {
    sum: u32,
    count: u32,
}

impl RatingTally {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let mut tally = Self::default();
        for rating in ratings {
            tally.add(rating);
        }
        tally
    }

    pub fn add(&mut self, rating: u8) {
        self.sum += u32::from(rating);
        self.count += 1;
    }

    /// Ignored when the tally is already empty.
    pub fn remove(&mut self, rating: u8) {
        if self.count == 0 {
            return;
        }
        self.sum = self.sum.saturating_sub(u32::from(rating));
        self.count -= 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| f64::from(self.sum) / f64::from(self.count))
    }
}

pub fn mean_rating(ratings: &[u8]) -> Option<f64> {
    RatingTally::from_ratings(ratings.iter().copied()).mean()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateRating {
    pub mean: f64,
    pub count: u32,
}

/// Row whose aggregate is recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingTarget {
    Property(PropertyId),
    Landlord(LandlordId),
}

impl RatingTarget {
    fn table(&self) -> Table {
        match self {
            Self::Property(_) => Table::Properties,
            Self::Landlord(_) => Table::Landlords,
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Property(id) => id.as_str(),
            Self::Landlord(id) => id.as_str(),
        }
    }

    fn review_column(&self) -> &'static str {
        match self {
            Self::Property(_) => "property_id",
            Self::Landlord(_) => "landlord_id",
        }
    }

    fn rating_of(&self, review: &Review) -> u8 {
        match self {
            Self::Property(_) => review.property_rating,
            Self::Landlord(_) => review.landlord_rating,
        }
    }
}

/// What to write when the target has no reviews left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenEmpty {
    /// Leave the stored aggregate untouched.
    Keep,
    /// Reset rating and review count to zero.
    Clear,
}

/// Read every review for `target`, then write the mean and count back.
///
/// Returns `None` when the target has no reviews.
pub async fn recompute_now(
    service: &dyn DataService,
    target: &RatingTarget,
    when_empty: WhenEmpty,
) -> Result<Option<AggregateRating>, RepositoryError> {
    let rows = service
        .select(Query::table(Table::Reviews).filter(Filter::eq(target.review_column(), target.id())))
        .await?;
    let reviews: Vec<Review> = decode_rows(rows)?;
    let tally = RatingTally::from_ratings(reviews.iter().map(|review| target.rating_of(review)));

    let aggregate = tally.mean().map(|mean| AggregateRating {
        mean,
        count: tally.count(),
    });
    let patch = match (&aggregate, when_empty) {
        (Some(aggregate), _) => json!({ "rating": aggregate.mean, "review_count": aggregate.count }),
        (None, WhenEmpty::Clear) => json!({ "rating": 0.0, "review_count": 0 }),
        (None, WhenEmpty::Keep) => {
            debug!(target_id = target.id(), "no reviews, aggregate left unchanged");
            return Ok(None);
        }
    };

    let updated = service
        .update(
            target.table(),
            Filter::eq("id", Value::from(target.id())),
            encode_row(&patch)?,
        )
        .await?;
    if updated.is_empty() {
        return Err(RepositoryError::NotFound {
            entity: target.table().name(),
        });
    }

    info!(
        table = target.table().name(),
        target_id = target.id(),
        review_count = tally.count(),
        "aggregate rating updated"
    );
    Ok(aggregate)
}

struct RecomputeJob {
    target: RatingTarget,
    when_empty: WhenEmpty,
    reply: oneshot::Sender<Result<Option<AggregateRating>, RepositoryError>>,
}

/// Single-writer queue for aggregate recomputation.
///
/// Cloning shares the same background task. The task stops once every
/// handle has been dropped.
#[derive(Clone)]
pub struct RatingAggregator {
    jobs: mpsc::Sender<RecomputeJob>,
}

impl RatingAggregator {
    /// Must be called from within a tokio runtime.
    pub fn spawn(service: SharedDataService) -> Self {
        let (jobs, mut queue) = mpsc::channel::<RecomputeJob>(QUEUE_DEPTH);
        tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                let outcome = recompute_now(service.as_ref(), &job.target, job.when_empty).await;
                if let Err(err) = &outcome {
                    warn!(error = %err, target_id = job.target.id(), "rating recomputation failed");
                }
                // The requester may have given up waiting.
                let _ = job.reply.send(outcome);
            }
            debug!("rating aggregator stopped");
        });
        Self { jobs }
    }

    /// Recompute after a new review; zero reviews leave the row untouched.
    pub async fn recompute(
        &self,
        target: RatingTarget,
    ) -> Result<Option<AggregateRating>, RepositoryError> {
        self.submit(target, WhenEmpty::Keep).await
    }

    /// Recompute after a review was removed; zero reviews reset the row.
    pub async fn recompute_after_removal(
        &self,
        target: RatingTarget,
    ) -> Result<Option<AggregateRating>, RepositoryError> {
        self.submit(target, WhenEmpty::Clear).await
    }

    async fn submit(
        &self,
        target: RatingTarget,
        when_empty: WhenEmpty,
    ) -> Result<Option<AggregateRating>, RepositoryError> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(RecomputeJob {
                target,
                when_empty,
                reply,
            })
            .await
            .map_err(|_| RepositoryError::Unavailable("rating aggregator stopped".to_string()))?;
        response.await.map_err(|_| {
            RepositoryError::Unavailable("rating aggregator dropped the request".to_string())
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryDataService, Row};
    use std::sync::Arc;

    fn row(value: Value) -> Row {
        encode_row(&value).expect("object row")
    }

    async fn seed(store: &MemoryDataService, property_ratings: &[u8]) {
        store
            .insert(
                Table::Properties,
                row(json!({
                    "id": "prop-1",
                    "landlord_id": "lnd-1",
                    "title": "Studio",
                    "address": "Main St 1",
                    "city": "Lund",
                    "price_per_month": 500.0,
                    "rating": 4.5,
                    "review_count": 2,
                })),
            )
            .await
            .expect("property inserted");
        for (index, rating) in property_ratings.iter().enumerate() {
            store
                .insert(
                    Table::Reviews,
                    row(json!({
                        "booking_id": format!("bkg-{index}"),
                        "property_id": "prop-1",
                        "student_id": "stu-1",
                        "landlord_id": "lnd-1",
                        "property_rating": rating,
                        "landlord_rating": 5,
                    })),
                )
                .await
                .expect("review inserted");
        }
    }

    fn property_row(store: &MemoryDataService) -> Row {
        store.rows(Table::Properties).remove(0)
    }

    #[test]
    fn mean_of_five_three_four_is_four() {
        assert_eq!(mean_rating(&[5, 3, 4]), Some(4.0));
        assert_eq!(mean_rating(&[]), None);
    }

    #[test]
    fn tally_tracks_additions_and_removals() {
        let mut tally = RatingTally::from_ratings([5, 4]);
        tally.add(3);
        assert_eq!(tally.mean(), Some(4.0));
        tally.remove(5);
        assert_eq!(tally.mean(), Some(3.5));
        tally.remove(4);
        tally.remove(3);
        tally.remove(3);
        assert_eq!(tally.count(), 0);
        assert_eq!(tally.mean(), None);
    }

    #[tokio::test]
    async fn recompute_writes_mean_and_count() {
        let store = MemoryDataService::new();
        seed(&store, &[5, 3, 4]).await;

        let aggregate = recompute_now(
            &store,
            &RatingTarget::Property(PropertyId::new("prop-1")),
            WhenEmpty::Keep,
        )
        .await
        .expect("recomputed");

        assert_eq!(aggregate, Some(AggregateRating { mean: 4.0, count: 3 }));
        let property = property_row(&store);
        assert_eq!(property["rating"], json!(4.0));
        assert_eq!(property["review_count"], json!(3));
    }

    #[tokio::test]
    async fn zero_reviews_leave_the_row_alone_unless_cleared() {
        let store = MemoryDataService::new();
        seed(&store, &[]).await;
        let target = RatingTarget::Property(PropertyId::new("prop-1"));

        let kept = recompute_now(&store, &target, WhenEmpty::Keep)
            .await
            .expect("no-op");
        assert_eq!(kept, None);
        assert_eq!(property_row(&store)["rating"], json!(4.5));

        recompute_now(&store, &target, WhenEmpty::Clear)
            .await
            .expect("cleared");
        assert_eq!(property_row(&store)["rating"], json!(0.0));
        assert_eq!(property_row(&store)["review_count"], json!(0));
    }

    #[tokio::test]
    async fn aggregator_answers_each_request_and_reports_missing_rows() {
        let store = MemoryDataService::new();
        seed(&store, &[5, 3, 4]).await;
        let aggregator = RatingAggregator::spawn(Arc::new(store.clone()));

        let property = RatingTarget::Property(PropertyId::new("prop-1"));
        let landlord = RatingTarget::Landlord(LandlordId::new("lnd-1"));
        let (first, second) = tokio::join!(
            aggregator.recompute(property.clone()),
            aggregator.recompute(property),
        );
        assert_eq!(first.expect("first"), second.expect("second"));

        // No landlord row exists in this store.
        let missing = aggregator.recompute(landlord).await;
        assert!(matches!(
            missing,
            Err(RepositoryError::NotFound {
                entity: "landlords"
            })
        ));
    }
}
