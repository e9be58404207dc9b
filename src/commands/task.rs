//! Task Commands

use serde_json::json;

use super::{delete, get, insert, list, update};
use crate::backend::{DataBackend, Query};
use crate::error::Result;
use crate::models::{NewTask, Task, TaskUpdate};

/// Tasks of one column, oldest first
pub async fn list_tasks(backend: &dyn DataBackend, column_id: &str) -> Result<Vec<Task>> {
    let query = Query::new()
        .eq("column_id", column_id)
        .order_by("created_at", true);
    list(backend, query, "fetching tasks").await
}

/// Tasks of several columns in one request, oldest first
pub async fn list_tasks_in(backend: &dyn DataBackend, column_ids: &[String]) -> Result<Vec<Task>> {
    if column_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::new()
        .is_in("column_id", column_ids.iter().cloned())
        .order_by("created_at", true);
    list(backend, query, "fetching tasks").await
}

pub async fn get_task(backend: &dyn DataBackend, id: &str) -> Result<Option<Task>> {
    get(backend, id, "fetching task").await
}

pub async fn create_task(backend: &dyn DataBackend, task: &NewTask<'_>) -> Result<Task> {
    insert(backend, task, "creating task").await
}

pub async fn update_task(backend: &dyn DataBackend, id: &str, updates: &TaskUpdate) -> Result<Task> {
    update(backend, id, updates, "updating task").await
}

/// Persist a new column for a task; nothing else is sent
pub async fn move_task(backend: &dyn DataBackend, id: &str, column_id: &str) -> Result<Task> {
    update(backend, id, &json!({ "column_id": column_id }), "moving task").await
}

pub async fn delete_task(backend: &dyn DataBackend, id: &str) -> Result<()> {
    delete::<Task>(backend, id, "deleting task").await
}
