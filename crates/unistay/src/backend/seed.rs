//! CSV seeding for reference tables (universities, amenities) on the local backend.

use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};
use tracing::info;

use super::{BackendError, DataService, Row, Table};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid seed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not store seed rows: {0}")]
    Backend(#[from] BackendError),
}

/// Parse a headed CSV into rows, inferring booleans, numbers, and nulls.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<Row>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.to_string(), infer_cell(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Leading zeros stay text so phone numbers and postcodes survive.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match cell {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let leading_zero = cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0.");
    if !leading_zero {
        if let Ok(int) = cell.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(cell.to_string())
}

pub async fn seed_table<R: Read>(
    service: &dyn DataService,
    table: Table,
    reader: R,
) -> Result<usize, SeedError> {
    let rows = parse_rows(reader)?;
    let count = rows.len();
    for row in rows {
        service.insert(table, row).await?;
    }
    info!(table = table.name(), rows = count, "seeded table");
    Ok(count)
}

/// Seed every `<table>.csv` found in `dir`; tables without a file are skipped.
pub async fn seed_directory(service: &dyn DataService, dir: &Path) -> Result<usize, SeedError> {
    let mut total = 0;
    for table in Table::ordered() {
        let path = dir.join(format!("{}.csv", table.name()));
        if !path.is_file() {
            continue;
        }
        let file = std::fs::File::open(&path)?;
        total += seed_table(service, table, file).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryDataService, Query};
    use serde_json::json;

    #[test]
    fn infers_cell_types() {
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("true"), json!(true));
        assert_eq!(infer_cell("42"), json!(42));
        assert_eq!(infer_cell("59.3498"), json!(59.3498));
        assert_eq!(infer_cell("0.5"), json!(0.5));
        assert_eq!(infer_cell("0701234567"), json!("0701234567"));
        assert_eq!(infer_cell("KTH Royal Institute"), json!("KTH Royal Institute"));
    }

    #[tokio::test]
    async fn seeds_universities_from_csv() {
        let store = MemoryDataService::new();
        let csv = "name,city,latitude,longitude\n\
                   KTH Royal Institute of Technology,Stockholm,59.3498,18.0707\n\
                   Uppsala University,Uppsala,59.8498,17.6297\n";

        let count = seed_table(&store, Table::Universities, csv.as_bytes())
            .await
            .expect("seed succeeds");
        assert_eq!(count, 2);

        let rows = store
            .select(Query::table(Table::Universities).order_by("name", false))
            .await
            .expect("select succeeds");
        assert_eq!(rows[0]["name"], json!("KTH Royal Institute of Technology"));
        assert_eq!(rows[1]["latitude"], json!(59.8498));
    }
}
