use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use unistay::backend::seed::seed_directory;
use unistay::backend::{MemoryDataService, RestDataService, SharedDataService};
use unistay::config::AppConfig;
use unistay::error::AppError;
use unistay::repository::Repositories;
use unistay::telemetry;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load configuration and install the tracing subscriber.
pub(crate) fn bootstrap() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;
    Ok(config)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Memory store, optionally filled from `<table>.csv` files in `seed_dir`.
pub(crate) async fn local_store(seed_dir: Option<&Path>) -> Result<MemoryDataService, AppError> {
    let store = MemoryDataService::new();
    if let Some(dir) = seed_dir {
        let rows = seed_directory(&store, dir).await?;
        info!(dir = %dir.display(), rows, "local backend seeded");
    }
    Ok(store)
}

/// The hosted backend when `APP_BACKEND_URL` is set, the local store otherwise.
pub(crate) async fn connect(
    config: &AppConfig,
    seed_dir: Option<&Path>,
) -> Result<Repositories, AppError> {
    let service: SharedDataService = match config.backend.url {
        Some(_) => {
            info!("using hosted backend");
            Arc::new(RestDataService::from_config(&config.backend)?)
        }
        None => {
            info!("APP_BACKEND_URL not set, using in-memory backend");
            Arc::new(local_store(seed_dir).await?)
        }
    };
    Ok(Repositories::new(service, config.booking.malformed_dates))
}
