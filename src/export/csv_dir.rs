use rusqlite::types::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use super::Exporter;
use crate::error::{Result, SyncError};
use crate::schema::{TableSchema, AVAILABILITY, AVAILABILITY_JOIN};
use crate::store::Store;

/// Writes the current store state as CSV files into a directory.
///
/// The joined snapshot is exported when it has rows. The raw availability
/// table is exported instead when the join is empty (a store no pass has
/// rebuilt yet) or cannot be read at all.
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_table(&self, store: &Store, schema: &TableSchema, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| SyncError::ExportWrite {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(file_name);
        let partial = self.dir.join(format!("{}.partial", file_name));

        let columns = schema.column_names();
        let rows = select_all(store, schema.name, &columns)?;

        let encode = |source| SyncError::ExportEncode {
            path: partial.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&partial).map_err(encode)?;
        writer.write_record(&columns).map_err(encode)?;
        for row in &rows {
            writer.write_record(row).map_err(encode)?;
        }
        writer.flush().map_err(|source| SyncError::ExportWrite {
            path: partial.clone(),
            source,
        })?;
        drop(writer);

        // readers of the directory never see a half-written file
        fs::rename(&partial, &path).map_err(|source| SyncError::ExportWrite {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = rows.len(), "exported");
        Ok(path)
    }
}

impl Exporter for CsvExporter {
    fn export(&self, store: &Store, label: &str) -> Result<Option<String>> {
        let joined = match joined_rows(store) {
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "join snapshot unreadable, exporting raw availability");
                0
            }
        };

        let path = if joined > 0 {
            self.write_table(store, &AVAILABILITY_JOIN, &format!("lot_update_combined_{}.csv", label))?
        } else {
            self.write_table(store, &AVAILABILITY, &format!("snapshot_{}.csv", label))?
        };
        Ok(Some(path.display().to_string()))
    }
}

fn joined_rows(store: &Store) -> rusqlite::Result<i64> {
    store.connection().query_row(
        &format!("SELECT COUNT(*) FROM {}", AVAILABILITY_JOIN.name),
        [],
        |row| row.get(0),
    )
}

/// Every row of `table` as text fields, NULL as empty.
fn select_all(store: &Store, table: &str, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        columns.join(", "),
        table,
        columns[..2].join(", ")
    );
    let mut stmt = store.connection().prepare(&sql).map_err(SyncError::Query)?;
    let width = columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i).map(field_text))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(SyncError::Query)?;
    Ok(rows)
}

fn field_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}
