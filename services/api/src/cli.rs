use crate::commands::{self, AdminCommand, BookingsCommand, PropertiesCommand};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use unistay::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "unistay",
    about = "Browse, book, and moderate UniStay student housing from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the local table backend (default command)
    Serve(ServeArgs),
    /// Walk a student, a landlord, and an admin through the marketplace
    Demo(DemoArgs),
    /// Search listings
    Properties {
        #[command(flatten)]
        backend: BackendArgs,
        #[command(subcommand)]
        command: PropertiesCommand,
    },
    /// Request a stay as a student
    Bookings {
        #[command(flatten)]
        backend: BackendArgs,
        #[command(subcommand)]
        command: BookingsCommand,
    },
    /// Marketplace statistics and exports
    Admin {
        #[command(flatten)]
        backend: BackendArgs,
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory of `<table>.csv` files loaded before serving
    #[arg(long)]
    pub(crate) seed_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BackendArgs {
    /// Seed the in-memory backend when APP_BACKEND_URL is not set
    #[arg(long, global = true)]
    pub(crate) seed_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Properties { backend, command } => commands::properties(backend, command).await,
        Command::Bookings { backend, command } => commands::bookings(backend, command).await,
        Command::Admin { backend, command } => commands::admin(backend, command).await,
    }
}
