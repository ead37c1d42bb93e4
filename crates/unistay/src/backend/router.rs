//! Local stand-in for the hosted table API.
//!
//! Serves a [`MemoryDataService`] at `/rest/v1/:table` using the same query
//! dialect [`super::RestDataService`] speaks, so the client can be exercised
//! end-to-end without the hosted backend.

use axum::extract::{Path, Query as QueryParams, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tracing::info;

use super::{BackendError, DataService, Filter, MemoryDataService, Order, Query, Row, Table};
use crate::error::AppError;

type Params = QueryParams<Vec<(String, String)>>;

/// Router builder exposing table CRUD over HTTP.
pub fn table_router(store: MemoryDataService) -> Router {
    Router::new()
        .route(
            "/rest/v1/:table",
            get(select_handler)
                .post(insert_handler)
                .patch(update_handler)
                .delete(delete_handler),
        )
        .with_state(store)
}

fn resolve_table(name: &str) -> Result<Table, AppError> {
    Table::from_name(name).ok_or_else(|| {
        AppError::Backend(BackendError::Status {
            status: 404,
            message: format!("relation \"{name}\" does not exist"),
        })
    })
}

fn read_query(table: Table, params: &[(String, String)]) -> Result<Query, AppError> {
    let mut query = Query::table(table);
    if let Some(filter) = Filter::from_query_pairs(params).map_err(BackendError::from)? {
        query = query.filter(filter);
    }
    for (key, value) in params {
        match key.as_str() {
            "order" => query.order = Order::parse(value),
            "limit" => {
                let limit = value.parse::<usize>().map_err(|_| {
                    AppError::Backend(BackendError::Status {
                        status: 400,
                        message: format!("limit must be a non-negative integer, got '{value}'"),
                    })
                })?;
                query = query.limit(limit);
            }
            _ => {}
        }
    }
    Ok(query)
}

/// Writes must be scoped; an unfiltered PATCH or DELETE is refused.
fn write_filter(params: &[(String, String)]) -> Result<Filter, AppError> {
    Filter::from_query_pairs(params)
        .map_err(BackendError::from)?
        .ok_or_else(|| {
            AppError::Backend(BackendError::Status {
                status: 400,
                message: "writes require at least one filter".to_string(),
            })
        })
}

pub(crate) async fn select_handler(
    State(store): State<MemoryDataService>,
    Path(table): Path<String>,
    QueryParams(params): Params,
) -> Result<Json<Vec<Row>>, AppError> {
    let table = resolve_table(&table)?;
    let query = read_query(table, &params)?;
    let rows = store.select(query).await?;
    Ok(Json(rows))
}

pub(crate) async fn insert_handler(
    State(store): State<MemoryDataService>,
    Path(table): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Vec<Row>>), AppError> {
    let table = resolve_table(&table)?;
    let rows = match payload {
        Value::Object(row) => vec![row],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(BackendError::Decode(format!("expected object, got {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(BackendError::Decode(format!("expected object, got {other}")).into()),
    };

    let mut inserted = Vec::with_capacity(rows.len());
    for row in rows {
        inserted.push(store.insert(table, row).await?);
    }
    info!(table = table.name(), rows = inserted.len(), "rows inserted");
    Ok((StatusCode::CREATED, Json(inserted)))
}

pub(crate) async fn update_handler(
    State(store): State<MemoryDataService>,
    Path(table): Path<String>,
    QueryParams(params): Params,
    Json(patch): Json<Row>,
) -> Result<Json<Vec<Row>>, AppError> {
    let table = resolve_table(&table)?;
    let filter = write_filter(&params)?;
    let rows = store.update(table, filter, patch).await?;
    Ok(Json(rows))
}

pub(crate) async fn delete_handler(
    State(store): State<MemoryDataService>,
    Path(table): Path<String>,
    QueryParams(params): Params,
) -> Result<Json<Vec<Row>>, AppError> {
    let table = resolve_table(&table)?;
    let filter = write_filter(&params)?;
    let rows = store.delete(table, filter).await?;
    info!(table = table.name(), rows = rows.len(), "rows deleted");
    Ok(Json(rows))
}
