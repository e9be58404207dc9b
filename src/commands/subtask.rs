//! Subtask Commands

use serde_json::json;

use super::{delete, get, insert, list, update};
use crate::backend::{DataBackend, Query};
use crate::error::Result;
use crate::models::{NewSubtask, Subtask, SubtaskUpdate};

/// Subtasks of one task, oldest first
pub async fn list_subtasks(backend: &dyn DataBackend, task_id: &str) -> Result<Vec<Subtask>> {
    let query = Query::new()
        .eq("task_id", task_id)
        .order_by("created_at", true);
    list(backend, query, "fetching subtasks").await
}

/// Subtasks of several tasks in one request, oldest first
pub async fn list_subtasks_in(backend: &dyn DataBackend, task_ids: &[String]) -> Result<Vec<Subtask>> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::new()
        .is_in("task_id", task_ids.iter().cloned())
        .order_by("created_at", true);
    list(backend, query, "fetching subtasks").await
}

pub async fn get_subtask(backend: &dyn DataBackend, id: &str) -> Result<Option<Subtask>> {
    get(backend, id, "fetching subtask").await
}

/// New subtasks always start incomplete
pub async fn create_subtask(backend: &dyn DataBackend, title: &str, task_id: &str) -> Result<Subtask> {
    let payload = NewSubtask {
        title,
        task_id,
        is_completed: false,
    };
    insert(backend, &payload, "creating subtask").await
}

pub async fn update_subtask(
    backend: &dyn DataBackend,
    id: &str,
    updates: &SubtaskUpdate,
) -> Result<Subtask> {
    update(backend, id, updates, "updating subtask").await
}

pub async fn set_subtask_completed(
    backend: &dyn DataBackend,
    id: &str,
    is_completed: bool,
) -> Result<Subtask> {
    let patch = json!({ "is_completed": is_completed });
    update(backend, id, &patch, "toggling subtask completion").await
}

pub async fn delete_subtask(backend: &dyn DataBackend, id: &str) -> Result<()> {
    delete::<Subtask>(backend, id, "deleting subtask").await
}
