use crate::backend::seed::SeedError;
use crate::backend::{BackendError, RestSetupError};
use crate::config::ConfigError;
use crate::repository::{ExportError, RepositoryError};
use crate::telemetry::TelemetryError;
use crate::viewmodel::ViewError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Backend(BackendError),
    Repository(RepositoryError),
    View(ViewError),
    Seed(SeedError),
    Export(ExportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Backend(err) => write!(f, "backend error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::View(err) => write!(f, "{}", err),
            AppError::Seed(err) => write!(f, "seed error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Backend(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::View(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

/// Error bodies use the `message` key the hosted table API answers with.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Backend(BackendError::Status { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Backend(BackendError::Filter(_) | BackendError::Decode(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Repository(RepositoryError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Backend(BackendError::Status { message, .. }) => message.clone(),
            other => other.to_string(),
        };
        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<ViewError> for AppError {
    fn from(value: ViewError) -> Self {
        Self::View(value)
    }
}

impl From<SeedError> for AppError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<RestSetupError> for AppError {
    fn from(value: RestSetupError) -> Self {
        match value {
            RestSetupError::Config(err) => Self::Config(err),
            RestSetupError::Backend(err) => Self::Backend(err),
        }
    }
}
