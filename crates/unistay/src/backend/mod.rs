//! Table-scoped access to the marketplace backend.
//!
//! The backend is a managed PostgREST-style service: every call names a table,
//! an optional filter, and for reads an ordering and a limit. Rows travel as
//! JSON objects and are mapped to domain types by the repositories.

mod filter;
mod memory;
mod rest;
pub mod router;
pub mod seed;

pub use filter::{Filter, FilterParseError};
pub use memory::MemoryDataService;
pub use rest::{RestDataService, RestSetupError};

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One backend row.
pub type Row = Map<String, Value>;

/// Handle shared by every repository.
pub type SharedDataService = Arc<dyn DataService>;

/// Tables the marketplace reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Students,
    Landlords,
    Properties,
    PropertyImages,
    PropertyAmenities,
    Amenities,
    Bookings,
    Reviews,
    Favorites,
    Universities,
}

impl Table {
    pub const fn ordered() -> [Self; 11] {
        [
            Self::Users,
            Self::Students,
            Self::Landlords,
            Self::Properties,
            Self::PropertyImages,
            Self::PropertyAmenities,
            Self::Amenities,
            Self::Bookings,
            Self::Reviews,
            Self::Favorites,
            Self::Universities,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Students => "students",
            Self::Landlords => "landlords",
            Self::Properties => "properties",
            Self::PropertyImages => "property_images",
            Self::PropertyAmenities => "property_amenities",
            Self::Amenities => "amenities",
            Self::Bookings => "bookings",
            Self::Reviews => "reviews",
            Self::Favorites => "favorites",
            Self::Universities => "universities",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|table| table.name() == name)
    }

    /// Prefix for ids minted by the in-memory backend.
    pub(crate) const fn id_prefix(self) -> &'static str {
        match self {
            Self::Users => "usr",
            Self::Students => "stu",
            Self::Landlords => "lnd",
            Self::Properties => "prop",
            Self::PropertyImages => "img",
            Self::PropertyAmenities => "pam",
            Self::Amenities => "amn",
            Self::Bookings => "bkg",
            Self::Reviews => "rev",
            Self::Favorites => "fav",
            Self::Universities => "uni",
        }
    }

    /// Column sets the hosted schema declares unique.
    pub(crate) const fn unique_keys(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Users => &[&["email"]],
            Self::Students | Self::Landlords => &[&["user_id"]],
            Self::Reviews => &[&["booking_id"]],
            Self::Favorites => &[&["student_id", "property_id"]],
            Self::PropertyAmenities => &[&["property_id", "amenity_id"]],
            _ => &[],
        }
    }
}

/// Sort key for a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    /// Parse the `order=column.desc` form.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (column, direction) = match raw.split_once('.') {
            Some((column, direction)) => (column, direction),
            None => (raw, "asc"),
        };
        let descending = match direction {
            "desc" => true,
            "asc" => false,
            _ => return None,
        };
        Some(Self {
            column: column.to_string(),
            descending,
        })
    }

    pub fn to_param(&self) -> String {
        let direction = if self.descending { "desc" } else { "asc" };
        format!("{}.{}", self.column, direction)
    }
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filter: Option<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filter: None,
            order: None,
            limit: None,
        }
    }

    /// Add a predicate; repeated calls are combined with `and`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in the PostgREST dialect.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        if let Some(filter) = &self.filter {
            params.extend(filter.to_query_pairs());
        }
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.to_param()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed row: {0}")]
    Decode(String),
    #[error(transparent)]
    Filter(#[from] FilterParseError),
}

impl BackendError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Status { status: 409, .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => BackendError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => BackendError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// The managed backend's table interface.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, query: Query) -> Result<Vec<Row>, BackendError>;
    async fn insert(&self, table: Table, row: Row) -> Result<Row, BackendError>;
    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError>;
    async fn delete(&self, table: Table, filter: Filter) -> Result<Vec<Row>, BackendError>;
}

pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, BackendError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(decode_row).collect()
}

pub fn encode_row<T: Serialize>(value: &T) -> Result<Row, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Decode(format!(
            "expected an object row, got {other}"
        ))),
    }
}

/// Total order over JSON cells: nulls last, numbers numerically, everything
/// else by its text.
pub(crate) fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => filter::literal(a).cmp(&filter::literal(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_follow_postgrest_layout() {
        let query = Query::table(Table::Bookings)
            .filter(Filter::eq("property_id", "prop-000001"))
            .filter(Filter::is_in("status", ["pending", "approved"]))
            .order_by("created_at", true)
            .limit(20);

        let params = query.to_params();
        assert_eq!(params[0], ("select".to_string(), "*".to_string()));
        assert!(params.contains(&("property_id".to_string(), "eq.prop-000001".to_string())));
        assert!(params.contains(&("status".to_string(), "in.(pending,approved)".to_string())));
        assert!(params.contains(&("order".to_string(), "created_at.desc".to_string())));
        assert!(params.contains(&("limit".to_string(), "20".to_string())));
    }

    #[test]
    fn order_parse_defaults_to_ascending() {
        assert_eq!(
            Order::parse("price_per_month"),
            Some(Order {
                column: "price_per_month".to_string(),
                descending: false,
            })
        );
        assert!(Order::parse("rating.sideways").is_none());
    }

    #[test]
    fn nulls_sort_after_values() {
        let one = Value::from(1);
        let ten = Value::from(10);
        assert_eq!(compare_cells(Some(&one), Some(&ten)), Ordering::Less);
        assert_eq!(compare_cells(None, Some(&one)), Ordering::Greater);
        assert_eq!(
            compare_cells(Some(&Value::Null), Some(&Value::from("a"))),
            Ordering::Greater
        );
    }
}
