mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{campus, day, studio};
use tokio::net::TcpListener;
use unistay::availability::MalformedDatePolicy;
use unistay::backend::router::table_router;
use unistay::backend::{MemoryDataService, RestDataService, Table};
use unistay::domain::{BookingStatus, UserRole};
use unistay::repository::{Repositories, RepositoryError};
use unistay::viewmodel::{BookingRequestViewModel, RegisterViewModel};

/// Serve `store` on an ephemeral port and return a client pointed at it.
async fn serve(store: MemoryDataService) -> RestDataService {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, table_router(store))
            .await
            .expect("table server");
    });
    RestDataService::new(format!("http://{addr}"), "local-anon-key", Duration::from_secs(5))
        .expect("client")
}

#[tokio::test]
async fn repositories_work_over_http() {
    let store = MemoryDataService::new();
    let client = serve(store.clone()).await;
    let campus = campus(Arc::new(client), MalformedDatePolicy::Ignore).await;
    let repos = campus.repos.clone();

    assert_eq!(store.count(Table::Users), 2);
    assert_eq!(store.count(Table::Students), 1);

    let landlord_id = campus.landlord.landlord_id.clone().expect("landlord");
    let listing = repos
        .properties
        .create(&landlord_id, &studio(&campus))
        .await
        .expect("listing over http");
    assert_eq!(listing.images.len(), 1);
    assert_eq!(listing.amenities.len(), 1);
    assert_eq!(store.count(Table::PropertyImages), 1);

    let request = BookingRequestViewModel::new(repos.clone());
    request.load(&listing.property.id).await;
    request.select_dates(day(2, 1), day(3, 1)).await;
    let booking = request
        .submit(&campus.student, day(1, 1))
        .await
        .expect("booking over http");

    let conflicting = repos
        .bookings
        .request(
            &listing.property,
            campus.student.student_id.as_ref().expect("student"),
            day(2, 15),
            day(3, 15),
            None,
            day(1, 1),
        )
        .await;
    assert!(matches!(conflicting, Err(RepositoryError::Conflict(_))));

    let approved = repos
        .bookings
        .update_status(&booking.id, BookingStatus::Approved)
        .await
        .expect("approve over http");
    assert_eq!(approved.status, BookingStatus::Approved);
}

#[tokio::test]
async fn duplicate_email_maps_to_conflict_over_http() {
    let store = MemoryDataService::new();
    let client = serve(store.clone()).await;
    let campus = campus(Arc::new(client), MalformedDatePolicy::Ignore).await;

    let register = RegisterViewModel::new(campus.repos.clone());
    let duplicate = register
        .register("maja@student.uu.se", "Maja Again", UserRole::Student)
        .await;
    assert!(duplicate.is_none());
    assert_eq!(
        register.state().snapshot().feedback.error_message.as_deref(),
        Some("An account with this email already exists")
    );
    assert_eq!(store.count(Table::Users), 2);
}

#[tokio::test]
async fn unreachable_backend_reports_a_generic_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = RestDataService::new(format!("http://{addr}"), "key", Duration::from_secs(2))
        .expect("client");
    let repos = Repositories::new(Arc::new(client), MalformedDatePolicy::Ignore);

    let register = RegisterViewModel::new(repos);
    assert!(register
        .register("ghost@uni.edu", "Ghost", UserRole::Student)
        .await
        .is_none());
    assert_eq!(
        register.state().snapshot().feedback.error_message.as_deref(),
        Some("Something went wrong. Please try again.")
    );
}
