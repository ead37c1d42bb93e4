mod common;

use std::sync::Arc;

use common::{campus, day, studio};
use serde_json::json;
use unistay::availability::{DateRange, MalformedDatePolicy};
use unistay::backend::{encode_row, DataService, MemoryDataService, Table};
use unistay::domain::{BookingStatus, UserRole};
use unistay::search::SortOrder;
use unistay::viewmodel::{
    AdminDashboardViewModel, BookingRequestViewModel, FavoritesViewModel,
    LandlordDashboardViewModel, ListingEditorViewModel, MapViewModel, PropertyBrowseViewModel,
    PropertyDetailViewModel, RegisterViewModel, ReviewViewModel, SignInViewModel,
    StudentBookingsViewModel,
};

#[tokio::test]
async fn student_books_landlord_approves_and_review_updates_ratings() {
    let store = MemoryDataService::new();
    let campus = campus(Arc::new(store.clone()), MalformedDatePolicy::Ignore).await;
    let repos = campus.repos.clone();

    let editor = ListingEditorViewModel::new(repos.clone());
    editor.start_new().await;
    let listing = editor
        .save(&campus.landlord, studio(&campus))
        .await
        .expect("listing created");
    let property_id = listing.property.id.clone();

    let browse = PropertyBrowseViewModel::new(repos.clone());
    browse.load().await;
    browse.search("svandammen");
    browse.sort_by(SortOrder::PriceLowToHigh);
    let visible = browse.state().snapshot().visible;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].property.id, property_id);

    let map = MapViewModel::new(repos.clone());
    map.load().await;
    map.select_university(&campus.university);
    let nearby = map.state().snapshot().nearby;
    assert_eq!(nearby.len(), 1);
    assert!(nearby[0].distance_km < 1.0);

    let detail = PropertyDetailViewModel::new(repos.clone());
    detail.load(Some(&campus.student), &property_id).await;
    detail.toggle_favorite(&campus.student).await;
    let favorites = FavoritesViewModel::new(repos.clone());
    favorites.load(&campus.student).await;
    assert_eq!(favorites.state().snapshot().properties.len(), 1);

    let request = BookingRequestViewModel::new(repos.clone());
    request.load(&property_id).await;
    request.select_dates(day(8, 1), day(8, 31)).await;
    assert_eq!(request.state().snapshot().available, Some(true));
    request.set_message("Starting my master's in August.");
    let booking = request
        .submit(&campus.student, day(1, 10))
        .await
        .expect("booking requested");
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_price, 750.0);

    let competing = BookingRequestViewModel::new(repos.clone());
    competing.load(&property_id).await;
    competing.select_dates(day(8, 20), day(9, 10)).await;
    assert_eq!(competing.state().snapshot().available, Some(false));
    competing.select_dates(day(8, 31), day(9, 30)).await;
    assert_eq!(
        competing.state().snapshot().available,
        Some(true),
        "check-out day can be the next check-in day"
    );

    let dashboard = LandlordDashboardViewModel::new(repos.clone());
    dashboard.load(&campus.landlord).await;
    assert_eq!(dashboard.state().snapshot().pending_count, 1);
    dashboard.approve(&campus.landlord, &booking.id).await;
    dashboard.complete(&campus.landlord, &booking.id).await;
    assert_eq!(
        dashboard.state().snapshot().requests[0].booking.status,
        BookingStatus::Completed
    );

    let my_bookings = StudentBookingsViewModel::new(repos.clone());
    my_bookings.load(&campus.student).await;
    let entry = &my_bookings.state().snapshot().entries[0];
    assert!(entry.can_review);
    assert!(!entry.can_cancel);

    let review = ReviewViewModel::new(repos.clone());
    review.load(&campus.student, &booking.id).await;
    review
        .submit(&campus.student, 5, 4, "Great light, responsive landlord.")
        .await
        .expect("review submitted");

    let property = repos.properties.get(&property_id).await.expect("property");
    assert_eq!(property.rating, 5.0);
    assert_eq!(property.review_count, 1);
    let landlord_id = campus.landlord.landlord_id.clone().expect("landlord profile");
    let landlord = repos.landlords.get(&landlord_id).await.expect("landlord");
    assert_eq!(landlord.rating, 4.0);
    assert_eq!(landlord.review_count, 1);

    my_bookings.load(&campus.student).await;
    assert!(!my_bookings.state().snapshot().entries[0].can_review);
}

#[tokio::test]
async fn removing_the_only_review_clears_the_rating() {
    let store = MemoryDataService::new();
    let campus = campus(Arc::new(store.clone()), MalformedDatePolicy::Ignore).await;
    let repos = campus.repos.clone();
    let listing = repos
        .properties
        .create(
            campus.landlord.landlord_id.as_ref().expect("landlord"),
            &studio(&campus),
        )
        .await
        .expect("listing");
    let student_id = campus.student.student_id.clone().expect("student");
    let booking = repos
        .bookings
        .request(&listing.property, &student_id, day(3, 1), day(4, 1), None, day(1, 1))
        .await
        .expect("booking");
    for status in [BookingStatus::Approved, BookingStatus::Completed] {
        repos
            .bookings
            .update_status(&booking.id, status)
            .await
            .expect("status");
    }
    let review = ReviewViewModel::new(repos.clone());
    review.load(&campus.student, &booking.id).await;
    let stored = review
        .submit(&campus.student, 2, 3, "")
        .await
        .expect("reviewed");

    let admin = RegisterViewModel::new(repos.clone())
        .register("ops@unistay.app", "Operations", UserRole::Admin)
        .await
        .expect("admin");
    let console = AdminDashboardViewModel::new(repos.clone());
    console.delete_review(&admin, &stored.id).await;
    assert_eq!(
        console.state().snapshot().feedback.success_message.as_deref(),
        Some("Review deleted")
    );

    let property = repos
        .properties
        .get(&listing.property.id)
        .await
        .expect("property");
    assert_eq!(property.rating, 0.0);
    assert_eq!(property.review_count, 0);
}

#[tokio::test]
async fn malformed_booking_dates_follow_the_configured_policy() {
    for (policy, expect_available) in [
        (MalformedDatePolicy::Ignore, true),
        (MalformedDatePolicy::Block, false),
    ] {
        let store = MemoryDataService::new();
        let campus = campus(Arc::new(store.clone()), policy).await;
        let repos = campus.repos.clone();
        let listing = repos
            .properties
            .create(
                campus.landlord.landlord_id.as_ref().expect("landlord"),
                &studio(&campus),
            )
            .await
            .expect("listing");
        store
            .insert(
                Table::Bookings,
                encode_row(&json!({
                    "property_id": listing.property.id,
                    "student_id": campus.student.student_id,
                    "start_date": "sometime in May",
                    "end_date": "2031-06-01",
                    "status": "approved",
                    "total_price": 0.0,
                }))
                .expect("row"),
            )
            .await
            .expect("raw booking");

        let range = DateRange::new(day(5, 1), day(5, 20)).expect("range");
        assert_eq!(
            repos.bookings.is_available(&listing.property.id, range).await,
            expect_available,
            "{policy:?}"
        );
    }
}

#[tokio::test]
async fn sign_in_restores_profile_ids() {
    let store = MemoryDataService::new();
    let campus = campus(Arc::new(store.clone()), MalformedDatePolicy::Ignore).await;

    let sign_in = SignInViewModel::new(campus.repos.clone());
    let session = sign_in
        .sign_in("  Maja@Student.UU.se ", Some("jwt-token".to_string()))
        .await
        .expect("signed in");
    assert_eq!(session.role, UserRole::Student);
    assert_eq!(session.student_id, campus.student.student_id);
    assert!(session.profile_completed);
    assert_eq!(session.access_token.as_deref(), Some("jwt-token"));

    assert!(sign_in.sign_in("nobody@example.com", None).await.is_none());
    assert_eq!(
        sign_in.state().snapshot().feedback.error_message.as_deref(),
        Some("No account found for that email")
    );
}
