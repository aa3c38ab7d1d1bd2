use super::remote::{Filter, RecordStore, RemoteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// In-process record store with the same contract as the hosted one.
///
/// `set_failing(true)` makes every call fail, which is how outages are simulated.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn guard(&self) -> Result<(), RemoteError> {
        if self.is_failing() {
            return Err(RemoteError::unavailable("simulated outage"));
        }
        Ok(())
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>>, RemoteError> {
        self.tables
            .lock()
            .map_err(|e| RemoteError::unavailable(e.to_string()))
    }
}

fn created_at(row: &Value) -> Option<DateTime<Utc>> {
    row.get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        self.guard()?;
        let tables = self.tables()?;

        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        // Rows are kept newest-insert first, so the stable sort breaks ties the same way.
        rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
        Ok(rows)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, RemoteError> {
        self.guard()?;

        let Value::Object(mut row) = record else {
            return Err(RemoteError::rejected("insert expects an object"));
        };

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(timestamp_now);
        row.entry("updated_at").or_insert_with(timestamp_now);

        let row = Value::Object(row);
        let mut tables = self.tables()?;
        tables.entry(table.to_string()).or_default().insert(0, row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, partial: Value) -> Result<Value, RemoteError> {
        self.guard()?;

        let Value::Object(changes) = partial else {
            return Err(RemoteError::rejected("update expects an object"));
        };

        let mut tables = self.tables()?;
        let row = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
            })
            .ok_or_else(|| RemoteError::rejected(format!("no row matched id {}", id)))?;

        if let Value::Object(fields) = row {
            for (key, value) in changes {
                fields.insert(key, value);
            }
            fields.insert("updated_at".to_string(), timestamp_now());
        }

        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        self.guard()?;

        let mut tables = self.tables()?;
        let rows = tables.entry(table.to_string()).or_default();
        let position = rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| RemoteError::rejected(format!("no row matched id {}", id)))?;
        rows.remove(position);
        Ok(())
    }
}
