//! Remote Access Functions
//!
//! Typed wrappers around the data backend, organized by entity. Each function
//! performs one request and flattens backend faults into `KanbanError`.

mod board;
mod column;
mod subtask;
mod task;

use serde::Serialize;

use crate::backend::{DataBackend, Query, Row};
use crate::error::{BackendError, KanbanError, Result};
use crate::models::Entity;

// Re-export all public items
pub use board::*;
pub use column::*;
pub use subtask::*;
pub use task::*;

// ========================
// Shared Helpers
// ========================

fn decode<T: Entity>(row: Row, action: &'static str) -> Result<T> {
    serde_json::from_value(row).map_err(|e| KanbanError::backend(action, BackendError::from(e)))
}

fn encode(value: &impl Serialize, action: &'static str) -> Result<Row> {
    serde_json::to_value(value).map_err(|e| KanbanError::backend(action, BackendError::from(e)))
}

/// Board titles must be non-empty; whitespace is left to the backend
fn require_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(KanbanError::missing_field("title"));
    }
    Ok(())
}

async fn list<T: Entity>(
    backend: &dyn DataBackend,
    query: Query,
    action: &'static str,
) -> Result<Vec<T>> {
    let rows = backend
        .select(T::TABLE, &query)
        .await
        .map_err(|e| KanbanError::backend(action, e))?;
    rows.into_iter().map(|row| decode(row, action)).collect()
}

/// A missing row is `Ok(None)`, not an error
async fn get<T: Entity>(backend: &dyn DataBackend, id: &str, action: &'static str) -> Result<Option<T>> {
    match backend.select_single(T::TABLE, id).await {
        Ok(row) => decode(row, action).map(Some),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(KanbanError::backend(action, e)),
    }
}

async fn insert<T: Entity>(
    backend: &dyn DataBackend,
    payload: &impl Serialize,
    action: &'static str,
) -> Result<T> {
    let row = backend
        .insert(T::TABLE, encode(payload, action)?)
        .await
        .map_err(|e| KanbanError::backend(action, e))?;
    decode(row, action)
}

async fn update<T: Entity>(
    backend: &dyn DataBackend,
    id: &str,
    patch: &impl Serialize,
    action: &'static str,
) -> Result<T> {
    let row = backend
        .update(T::TABLE, id, encode(patch, action)?)
        .await
        .map_err(|e| KanbanError::backend(action, e))?;
    decode(row, action)
}

async fn delete<T: Entity>(backend: &dyn DataBackend, id: &str, action: &'static str) -> Result<()> {
    backend
        .delete(T::TABLE, id)
        .await
        .map_err(|e| KanbanError::backend(action, e))
}
