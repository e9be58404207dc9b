//! In-memory Backend
//!
//! Keeps every table as a vector of JSON rows. Enforces the board → column →
//! task → subtask foreign keys and cascades deletes the way the hosted database
//! does. Faults can be injected per operation for exercising error paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{field_str, DataBackend, Query, Row};
use crate::error::{BackendError, BackendResult};

/// Backend operation kinds, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    SelectSingle,
    Insert,
    Update,
    Delete,
}

/// (child table, foreign key column, parent table)
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("columns", "board_id", "boards"),
    ("tasks", "column_id", "columns"),
    ("subtasks", "task_id", "tasks"),
];

const FK_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    faults: Mutex<HashMap<(Op, String), String>>,
    calls: Mutex<HashMap<(Op, String), usize>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `op` on `table` fail with `message`
    pub async fn fail_next(&self, op: Op, table: &str, message: impl Into<String>) {
        self.faults
            .lock()
            .await
            .insert((op, table.to_string()), message.into());
    }

    /// Number of `op` requests issued against `table` so far
    pub async fn calls(&self, op: Op, table: &str) -> usize {
        self.calls
            .lock()
            .await
            .get(&(op, table.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of every row in a table, in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Count the request and consume an injected fault, if any
    async fn enter(&self, op: Op, table: &str) -> BackendResult<()> {
        debug!(?op, table, "memory backend request");
        *self
            .calls
            .lock()
            .await
            .entry((op, table.to_string()))
            .or_insert(0) += 1;

        match self.faults.lock().await.remove(&(op, table.to_string())) {
            Some(message) => Err(BackendError::fault(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>> {
        self.enter(Op::Select, table).await?;
        let tables = self.tables.lock().await;

        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Stable sort keeps insertion order for equal keys
            rows.sort_by(|a, b| {
                let ordering = field_str(a, &order.column).cmp(&field_str(b, &order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn select_single(&self, table: &str, id: &str) -> BackendResult<Row> {
        self.enter(Op::SelectSingle, table).await?;
        let tables = self.tables.lock().await;

        tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| field_str(row, "id") == Some(id)))
            .cloned()
            .ok_or_else(|| BackendError::not_found(table))
    }

    async fn insert(&self, table: &str, mut row: Row) -> BackendResult<Row> {
        self.enter(Op::Insert, table).await?;
        let mut tables = self.tables.lock().await;

        let fields = row
            .as_object_mut()
            .ok_or_else(|| BackendError::fault("row must be a JSON object"))?;
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });

        check_foreign_keys(&tables, table, &row)?;

        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> BackendResult<Row> {
        self.enter(Op::Update, table).await?;
        let mut tables = self.tables.lock().await;

        let changes = patch
            .as_object()
            .ok_or_else(|| BackendError::fault("patch must be a JSON object"))?;

        let position = tables
            .get(table)
            .and_then(|rows| rows.iter().position(|row| field_str(row, "id") == Some(id)))
            .ok_or_else(|| BackendError::not_found(table))?;

        let mut updated = tables[table][position].clone();
        if let Some(fields) = updated.as_object_mut() {
            for (key, value) in changes {
                if key != "id" {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        check_foreign_keys(&tables, table, &updated)?;

        if let Some(rows) = tables.get_mut(table) {
            rows[position] = updated.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> BackendResult<()> {
        self.enter(Op::Delete, table).await?;
        let mut tables = self.tables.lock().await;
        cascade_delete(&mut tables, table, id);
        Ok(())
    }
}

fn check_foreign_keys(
    tables: &HashMap<String, Vec<Row>>,
    table: &str,
    row: &Row,
) -> BackendResult<()> {
    for (child, column, parent) in FOREIGN_KEYS {
        if *child != table {
            continue;
        }

        let Some(parent_id) = field_str(row, column) else {
            return Err(BackendError::fault_with_code(
                NOT_NULL_VIOLATION,
                format!("null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"),
            ));
        };

        let exists = tables
            .get(*parent)
            .map(|rows| rows.iter().any(|r| field_str(r, "id") == Some(parent_id)))
            .unwrap_or(false);

        if !exists {
            return Err(BackendError::fault_with_code(
                FK_VIOLATION,
                format!("insert or update on table \"{table}\" violates foreign key constraint \"{table}_{column}_fkey\""),
            ));
        }
    }
    Ok(())
}

/// Delete a row and, depth first, every row referencing it
fn cascade_delete(tables: &mut HashMap<String, Vec<Row>>, table: &str, id: &str) {
    for (child, column, parent) in FOREIGN_KEYS {
        if *parent != table {
            continue;
        }

        let child_ids: Vec<String> = tables
            .get(*child)
            .map(|rows| {
                rows.iter()
                    .filter(|row| field_str(row, column) == Some(id))
                    .filter_map(|row| field_str(row, "id").map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        for child_id in child_ids {
            cascade_delete(tables, child, &child_id);
        }
    }

    if let Some(rows) = tables.get_mut(table) {
        rows.retain(|row| field_str(row, "id") != Some(id));
    }
}
