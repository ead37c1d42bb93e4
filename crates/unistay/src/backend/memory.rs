use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{compare_cells, BackendError, DataService, Filter, Query, Row, Table};

/// In-process table store with the same surface as the hosted backend.
///
/// Inserts mint `<prefix>-000001` style ids and a `created_at` timestamp when
/// the row does not carry them, and unique column sets are enforced with the
/// same 409 status the hosted service answers with.
#[derive(Default, Clone)]
pub struct MemoryDataService {
    inner: Arc<Mutex<MemoryTables>>,
}

#[derive(Default)]
struct MemoryTables {
    tables: HashMap<Table, Vec<Row>>,
    sequence: u64,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, MemoryTables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every row currently stored in `table`, in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, table: Table) -> usize {
        self.tables().tables.get(&table).map_or(0, Vec::len)
    }
}

/// First unique column set `candidate` collides on, ignoring the row at `skip`.
fn unique_violation(
    table: Table,
    rows: &[Row],
    candidate: &Row,
    skip: Option<usize>,
) -> Option<&'static [&'static str]> {
    table.unique_keys().iter().copied().find(|columns| {
        rows.iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .any(|(_, existing)| {
                columns.iter().all(|column| {
                    let left = existing.get(*column).filter(|value| !value.is_null());
                    let right = candidate.get(*column).filter(|value| !value.is_null());
                    left.is_some() && left == right
                })
            })
    })
}

fn conflict(table: Table, columns: &[&str]) -> BackendError {
    BackendError::Status {
        status: 409,
        message: format!(
            "duplicate key value violates unique constraint on {}({})",
            table.name(),
            columns.join(", ")
        ),
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn select(&self, query: Query) -> Result<Vec<Row>, BackendError> {
        let guard = self.tables();
        let mut rows: Vec<Row> = guard
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.as_ref().map_or(true, |f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row, BackendError> {
        let mut guard = self.tables();
        let MemoryTables { tables, sequence } = &mut *guard;
        let rows = tables.entry(table).or_default();

        if let Some(columns) = unique_violation(table, rows, &row, None) {
            return Err(conflict(table, columns));
        }

        if row.get("id").map_or(true, Value::is_null) {
            *sequence += 1;
            let id = format!("{}-{:06}", table.id_prefix(), sequence);
            row.insert("id".to_string(), Value::String(id));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            row.insert(
                "created_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        let mut guard = self.tables();
        let Some(rows) = guard.tables.get_mut(&table) else {
            return Ok(Vec::new());
        };

        // Patch a copy so a rejected update leaves the table untouched.
        let mut patched = rows.clone();
        let mut touched = Vec::new();
        for (index, row) in patched.iter_mut().enumerate() {
            if !filter.matches(row) {
                continue;
            }
            for (column, value) in &patch {
                if column != "id" {
                    row.insert(column.clone(), value.clone());
                }
            }
            touched.push(index);
        }
        for &index in &touched {
            if let Some(columns) = unique_violation(table, &patched, &patched[index], Some(index)) {
                return Err(conflict(table, columns));
            }
        }

        let updated: Vec<Row> = touched.iter().map(|&index| patched[index].clone()).collect();
        *rows = patched;
        Ok(updated)
    }

    async fn delete(&self, table: Table, filter: Filter) -> Result<Vec<Row>, BackendError> {
        let mut guard = self.tables();
        let Some(rows) = guard.tables.get_mut(&table) else {
            return Ok(Vec::new());
        };

        let (removed, kept): (Vec<Row>, Vec<Row>) =
            rows.drain(..).partition(|row| filter.matches(row));
        *rows = kept;
        Ok(removed)
    }
}
