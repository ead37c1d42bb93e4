use crate::commands::{check, print_listing};
use crate::infra::{bootstrap, parse_date};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::io;
use std::sync::Arc;
use unistay::backend::seed::seed_table;
use unistay::backend::{MemoryDataService, Table};
use unistay::domain::{
    AmenityId, BookingStatus, LandlordProfileInput, PropertyDraft, StudentProfileInput,
    University, UserRole,
};
use unistay::error::AppError;
use unistay::repository::Repositories;
use unistay::session::Session;
use unistay::viewmodel::{
    AdminDashboardViewModel, BookingRequestViewModel, LandlordDashboardViewModel,
    LandlordProfileViewModel, ListingEditorViewModel, MapViewModel, PropertyBrowseViewModel,
    PropertyDetailViewModel, RegisterViewModel, ReviewViewModel, StudentBookingsViewModel,
    StudentProfileViewModel, ViewError,
};

const UNIVERSITIES_CSV: &str = "\
name,city,latitude,longitude
KTH Royal Institute of Technology,Stockholm,59.3498,18.0707
Stockholm University,Stockholm,59.3650,18.0585
";

const AMENITIES_CSV: &str = "\
name,icon
Wi-Fi,wifi
Laundry,local_laundry_service
Furnished,chair
";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the bookings CSV export at the end.
    #[arg(long)]
    pub(crate) export: bool,
}

/// What the walkthrough ended with.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DemoOutcome {
    pub(crate) listings: usize,
    pub(crate) booking_status: BookingStatus,
    pub(crate) property_rating: f64,
    pub(crate) landlord_verified: bool,
    pub(crate) exported_rows: Option<usize>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    bootstrap()?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let outcome = walkthrough(today, args.export).await?;
    println!(
        "\nDemo complete: {} listings, booking {}, property rated {:.1}",
        outcome.listings,
        outcome.booking_status.as_str(),
        outcome.property_rating
    );
    Ok(())
}

fn heading(title: &str) {
    println!("\n== {title} ==");
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, AppError> {
    value.ok_or_else(|| ViewError::invalid(format!("demo step failed: {what}")).into())
}

async fn register(
    repos: &Repositories,
    email: &str,
    name: &str,
    role: UserRole,
) -> Result<Session, AppError> {
    let screen = RegisterViewModel::new(repos.clone());
    let session = screen.register(email, name, role).await;
    check(&screen.state().snapshot().feedback)?;
    let session = required(session, "register")?;
    println!("Registered {} ({})", session.email, session.role.label());
    Ok(session)
}

fn listing_draft(
    title: &str,
    address: &str,
    (latitude, longitude): (f64, f64),
    price: f64,
    university: &University,
    amenity_ids: Vec<AmenityId>,
) -> PropertyDraft {
    PropertyDraft {
        title: title.to_string(),
        description: Some(format!("{title}, close to {}.", university.name)),
        address: address.to_string(),
        city: university.city.clone(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        price_per_month: price,
        deposit: Some(price),
        bedrooms: 1,
        bathrooms: 1,
        max_occupants: 1,
        available_from: None,
        available_to: None,
        university_id: Some(university.id.clone()),
        image_urls: vec![format!(
            "https://images.unistay.app/{}.jpg",
            title.to_lowercase().replace(' ', "-")
        )],
        amenity_ids,
    }
}

/// Every role, start to finish, against a fresh in-memory backend.
pub(crate) async fn walkthrough(today: NaiveDate, export: bool) -> Result<DemoOutcome, AppError> {
    let store = MemoryDataService::new();
    seed_table(&store, Table::Universities, UNIVERSITIES_CSV.as_bytes()).await?;
    seed_table(&store, Table::Amenities, AMENITIES_CSV.as_bytes()).await?;
    let repos = Repositories::new(Arc::new(store), Default::default());

    let universities = repos.catalog.universities().await?;
    let amenities = repos.catalog.amenities().await?;
    let kth = required(
        universities.iter().find(|university| university.name.starts_with("KTH")),
        "seeded university",
    )?;

    heading("Landlord onboarding");
    let mut landlord =
        register(&repos, "lars@berghomes.se", "Lars Berg", UserRole::Landlord).await?;
    let profile = LandlordProfileViewModel::new(repos.clone());
    let saved = profile
        .save(
            &mut landlord,
            LandlordProfileInput {
                company_name: Some("Berg Homes".to_string()),
                phone: Some("+46 70 123 45 67".to_string()),
            },
        )
        .await;
    check(&profile.state().snapshot().feedback)?;
    required(saved.then_some(()), "landlord profile")?;

    let all_amenities: Vec<_> = amenities.iter().map(|amenity| amenity.id.clone()).collect();
    let drafts = [
        listing_draft(
            "Bright studio in Vasastan",
            "Odengatan 52",
            (59.3440, 18.0520),
            650.0,
            kth,
            all_amenities.clone(),
        ),
        listing_draft(
            "Room by Lappis",
            "Lappkärrsberget 3",
            (59.3670, 18.0600),
            420.0,
            kth,
            all_amenities.iter().take(1).cloned().collect(),
        ),
    ];
    let mut listings = Vec::new();
    for draft in drafts {
        let screen = ListingEditorViewModel::new(repos.clone());
        let listing = screen.save(&landlord, draft).await;
        check(&screen.state().snapshot().feedback)?;
        let listing = required(listing, "create listing")?;
        println!(
            "Listed {} at {:.2}/month",
            listing.property.title, listing.property.price_per_month
        );
        listings.push(listing);
    }

    heading("Student search");
    let mut student =
        register(&repos, "ana@student.kth.se", "Ana Lopez", UserRole::Student).await?;
    let profile = StudentProfileViewModel::new(repos.clone());
    profile.load(&student).await;
    let saved = profile
        .save(
            &mut student,
            StudentProfileInput {
                university_id: Some(kth.id.clone()),
                budget_min: Some(300.0),
                budget_max: Some(700.0),
                major: Some("Computer Science".to_string()),
                year_of_study: Some(1),
                phone: None,
            },
        )
        .await;
    check(&profile.state().snapshot().feedback)?;
    required(saved.then_some(()), "student profile")?;

    let browse = PropertyBrowseViewModel::new(repos.clone());
    browse.load().await;
    browse.search("studio");
    let found = browse.state().snapshot();
    check(&found.feedback)?;
    println!("'studio' matches {} of {} listings", found.visible.len(), found.listings.len());
    found.visible.iter().for_each(print_listing);

    let map = MapViewModel::new(repos.clone());
    map.load().await;
    map.select_university(&kth.id);
    map.set_max_distance(3.0);
    for nearby in map.state().snapshot().nearby {
        println!(
            "{:.2} km from {}: {}",
            nearby.distance_km, kth.name, nearby.property.title
        );
    }

    let chosen = &listings[0].property;
    let detail = PropertyDetailViewModel::new(repos.clone());
    detail.load(Some(&student), &chosen.id).await;
    detail.toggle_favorite(&student).await;
    check(&detail.state().snapshot().feedback)?;
    println!("Saved {} to favorites", chosen.title);

    heading("Booking request");
    let start = today + Duration::days(14);
    let end = start + Duration::days(60);
    let request = BookingRequestViewModel::new(repos.clone());
    request.load(&chosen.id).await;
    request.select_dates(start, end).await;
    if let Some(quote) = request.state().snapshot().quote {
        println!("{} nights quoted at {:.2}", quote.nights, quote.total_price);
    }
    request.set_message("Hi! I start at KTH this autumn.");
    let booking = request.submit(&student, today).await;
    check(&request.state().snapshot().feedback)?;
    let booking = required(booking, "booking request")?;
    println!("Requested {} ({})", booking.id, booking.status.label());

    heading("Landlord responds");
    let dashboard = LandlordDashboardViewModel::new(repos.clone());
    dashboard.load(&landlord).await;
    println!("{} pending request(s)", dashboard.state().snapshot().pending_count);
    dashboard.approve(&landlord, &booking.id).await;
    check(&dashboard.state().snapshot().feedback)?;
    dashboard.complete(&landlord, &booking.id).await;
    check(&dashboard.state().snapshot().feedback)?;

    heading("Review");
    let history = StudentBookingsViewModel::new(repos.clone());
    history.load(&student).await;
    let entry = required(
        history.state().snapshot().entries.into_iter().next(),
        "booking history",
    )?;
    println!(
        "{}: {} (reviewable: {})",
        entry.property_title,
        entry.booking.status.label(),
        entry.can_review
    );
    let review = ReviewViewModel::new(repos.clone());
    review.load(&student, &booking.id).await;
    let submitted = review
        .submit(&student, 5, 4, "Quiet, bright, and close to the metro.")
        .await;
    check(&review.state().snapshot().feedback)?;
    required(submitted, "review")?;
    let rated = repos.properties.get(&chosen.id).await?;
    println!(
        "{} now rated {:.1} from {} review(s)",
        rated.title, rated.rating, rated.review_count
    );

    heading("Moderation");
    let admin = register(&repos, "admin@unistay.app", "Site Admin", UserRole::Admin).await?;
    let console = AdminDashboardViewModel::new(repos.clone());
    let landlord_id = required(landlord.landlord_id.clone(), "landlord id")?;
    console.set_landlord_verified(&admin, &landlord_id, true).await;
    check(&console.state().snapshot().feedback)?;
    let state = console.state().snapshot();
    let stats = required(state.stats, "admin stats")?;
    println!(
        "{} students, {} landlords, {} active listings, {} completed bookings",
        stats.students,
        stats.landlords,
        stats.properties_active,
        stats.bookings_with_status(BookingStatus::Completed)
    );
    let landlord_verified = state
        .landlords
        .iter()
        .any(|candidate| candidate.id == landlord_id && candidate.verified);

    let exported_rows = if export {
        heading("Bookings export");
        let rows = console.export_bookings(&admin, io::stdout()).await;
        check(&console.state().snapshot().feedback)?;
        rows
    } else {
        None
    };

    Ok(DemoOutcome {
        listings: listings.len(),
        booking_status: entry.booking.status,
        property_rating: rated.rating,
        landlord_verified,
        exported_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn walkthrough_reaches_a_reviewed_stay() {
        let today = NaiveDate::from_ymd_opt(2031, 7, 1).expect("valid date");
        let outcome = walkthrough(today, false).await.expect("demo runs");
        assert_eq!(
            outcome,
            DemoOutcome {
                listings: 2,
                booking_status: BookingStatus::Completed,
                property_rating: 5.0,
                landlord_verified: true,
                exported_rows: None,
            }
        );
    }

    #[tokio::test]
    async fn walkthrough_can_export() {
        let today = NaiveDate::from_ymd_opt(2031, 7, 1).expect("valid date");
        let outcome = walkthrough(today, true).await.expect("demo runs");
        assert_eq!(outcome.exported_rows, Some(1));
    }
}
