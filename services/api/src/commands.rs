use crate::cli::BackendArgs;
use crate::infra::{bootstrap, connect, parse_date};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use unistay::domain::{PropertyId, PropertyListing};
use unistay::error::AppError;
use unistay::repository::Repositories;
use unistay::search::{PropertyFilter, SortOrder};
use unistay::session::Session;
use unistay::viewmodel::{
    AdminDashboardViewModel, BookingRequestViewModel, Feedback, MapViewModel,
    PropertyBrowseViewModel, SignInViewModel, ViewError, DEFAULT_RADIUS_KM,
};

#[derive(Subcommand, Debug)]
pub(crate) enum PropertiesCommand {
    /// Filter active listings by text, city, price, and size
    Search(SearchArgs),
    /// Listings within a radius of a university
    Near(NearArgs),
}

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Matched against title, city, and address
    #[arg(default_value = "")]
    pub(crate) query: String,
    #[arg(long)]
    pub(crate) city: Option<String>,
    #[arg(long)]
    pub(crate) max_price: Option<f64>,
    #[arg(long)]
    pub(crate) min_bedrooms: Option<u8>,
    /// newest, price-asc, price-desc, or rating
    #[arg(long, value_parser = parse_sort, default_value = "newest")]
    pub(crate) sort: SortOrder,
}

#[derive(Args, Debug)]
pub(crate) struct NearArgs {
    /// University id or part of its name
    #[arg(long)]
    pub(crate) university: String,
    #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
    pub(crate) radius_km: f64,
}

#[derive(Subcommand, Debug)]
pub(crate) enum BookingsCommand {
    /// Ask a landlord for a stay
    Request(RequestArgs),
}

#[derive(Args, Debug)]
pub(crate) struct RequestArgs {
    /// Student account email
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) property: String,
    /// Check-in date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    /// Check-out date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: NaiveDate,
    #[arg(long)]
    pub(crate) message: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum AdminCommand {
    /// Account, listing, and booking counters
    Stats(AdminArgs),
    /// Write every booking as CSV
    ExportBookings(ExportArgs),
}

#[derive(Args, Debug)]
pub(crate) struct AdminArgs {
    /// Admin account email
    #[arg(long)]
    pub(crate) email: String,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) admin: AdminArgs,
    /// Output file; stdout when omitted
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

fn parse_sort(raw: &str) -> Result<SortOrder, String> {
    SortOrder::parse(raw).ok_or_else(|| format!("unknown sort order '{raw}'"))
}

/// Surface a screen's error message as a command failure.
pub(crate) fn check(feedback: &Feedback) -> Result<(), AppError> {
    match &feedback.error_message {
        Some(message) => Err(ViewError::invalid(message.clone()).into()),
        None => Ok(()),
    }
}

async fn repositories(backend: &BackendArgs) -> Result<Repositories, AppError> {
    let config = bootstrap()?;
    connect(&config, backend.seed_dir.as_deref()).await
}

async fn sign_in(repos: &Repositories, email: &str) -> Result<Session, AppError> {
    let screen = SignInViewModel::new(repos.clone());
    match screen.sign_in(email, None).await {
        Some(session) => Ok(session),
        None => {
            check(&screen.state().snapshot().feedback)?;
            Err(ViewError::invalid("sign-in failed").into())
        }
    }
}

pub(crate) fn print_listing(listing: &PropertyListing) {
    let property = &listing.property;
    println!(
        "  {:<14} {:<32} {:<12} {:>8.2}/month  {} bd  {:.1}★ ({})",
        property.id.as_str(),
        property.title,
        property.city,
        property.price_per_month,
        property.bedrooms,
        property.rating,
        property.review_count
    );
}

pub(crate) async fn properties(
    backend: BackendArgs,
    command: PropertiesCommand,
) -> Result<(), AppError> {
    let repos = repositories(&backend).await?;
    match command {
        PropertiesCommand::Search(args) => {
            let screen = PropertyBrowseViewModel::new(repos);
            screen.load().await;
            screen.apply_filter(PropertyFilter {
                query: args.query,
                city: args.city,
                max_price: args.max_price,
                min_bedrooms: args.min_bedrooms,
                sort: args.sort,
                ..PropertyFilter::default()
            });
            let state = screen.state().snapshot();
            check(&state.feedback)?;
            println!("{} of {} listings match", state.visible.len(), state.listings.len());
            state.visible.iter().for_each(print_listing);
        }
        PropertiesCommand::Near(args) => {
            let screen = MapViewModel::new(repos);
            screen.load().await;
            check(&screen.state().snapshot().feedback)?;

            let needle = args.university.to_lowercase();
            let university = screen
                .state()
                .snapshot()
                .universities
                .into_iter()
                .find(|university| {
                    university.id.as_str() == args.university
                        || university.name.to_lowercase().contains(&needle)
                })
                .ok_or_else(|| {
                    ViewError::invalid(format!("no university matches '{}'", args.university))
                })?;
            screen.select_university(&university.id);
            screen.set_max_distance(args.radius_km);

            let state = screen.state().snapshot();
            println!(
                "{} listings within {:.1} km of {}",
                state.nearby.len(),
                state.max_distance_km,
                university.name
            );
            for nearby in &state.nearby {
                println!(
                    "  {:<14} {:<32} {:>5.2} km  {:>8.2}/month",
                    nearby.property.id.as_str(),
                    nearby.property.title,
                    nearby.distance_km,
                    nearby.property.price_per_month
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn bookings(
    backend: BackendArgs,
    command: BookingsCommand,
) -> Result<(), AppError> {
    let repos = repositories(&backend).await?;
    match command {
        BookingsCommand::Request(args) => {
            let session = sign_in(&repos, &args.email).await?;
            let screen = BookingRequestViewModel::new(repos);
            screen.load(&PropertyId::new(args.property)).await;
            check(&screen.state().snapshot().feedback)?;

            screen.select_dates(args.start, args.end).await;
            if let Some(message) = &args.message {
                screen.set_message(message);
            }
            let booking = screen.submit(&session, Local::now().date_naive()).await;
            let state = screen.state().snapshot();
            check(&state.feedback)?;
            if let Some(booking) = booking {
                println!(
                    "Booking {} requested: {} to {}, total {:.2} ({})",
                    booking.id,
                    booking.start_date,
                    booking.end_date,
                    booking.total_price,
                    booking.status.label()
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn admin(backend: BackendArgs, command: AdminCommand) -> Result<(), AppError> {
    let repos = repositories(&backend).await?;
    let screen = AdminDashboardViewModel::new(repos.clone());
    match command {
        AdminCommand::Stats(args) => {
            let session = sign_in(&repos, &args.email).await?;
            screen.load(&session).await;
            let state = screen.state().snapshot();
            check(&state.feedback)?;
            if let Some(stats) = state.stats {
                println!(
                    "Accounts: {} students, {} landlords ({} unverified), {} admins",
                    stats.students, stats.landlords, stats.unverified_landlords, stats.admins
                );
                println!(
                    "Listings: {} active of {}",
                    stats.properties_active, stats.properties_total
                );
                println!("Bookings: {}", stats.bookings_total);
                for entry in &stats.bookings_by_status {
                    println!("  {:<10} {}", entry.status_label, entry.count);
                }
                println!("Reviews: {}", stats.reviews);
            }
        }
        AdminCommand::ExportBookings(args) => {
            let session = sign_in(&repos, &args.admin.email).await?;
            let rows = match &args.out {
                Some(path) => {
                    let file = BufWriter::new(File::create(path)?);
                    screen.export_bookings(&session, file).await
                }
                None => screen.export_bookings(&session, io::stdout()).await,
            };
            check(&screen.state().snapshot().feedback)?;
            if let (Some(rows), Some(path)) = (rows, &args.out) {
                eprintln!("Wrote {rows} bookings to {}", path.display());
            }
            io::stdout().flush()?;
        }
    }
    Ok(())
}
