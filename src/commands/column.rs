//! Column Commands

use serde_json::json;

use super::{delete, get, insert, list, update};
use crate::backend::{DataBackend, Query};
use crate::error::Result;
use crate::models::{Column, NewColumn};

/// Columns of a board, in backend order
pub async fn list_columns(backend: &dyn DataBackend, board_id: &str) -> Result<Vec<Column>> {
    list(backend, Query::new().eq("board_id", board_id), "fetching columns").await
}

/// Columns of a board, oldest first
pub async fn list_columns_ordered(backend: &dyn DataBackend, board_id: &str) -> Result<Vec<Column>> {
    let query = Query::new()
        .eq("board_id", board_id)
        .order_by("created_at", true);
    list(backend, query, "fetching columns").await
}

pub async fn get_column(backend: &dyn DataBackend, id: &str) -> Result<Option<Column>> {
    get(backend, id, "fetching column").await
}

pub async fn create_column(backend: &dyn DataBackend, title: &str, board_id: &str) -> Result<Column> {
    insert(backend, &NewColumn { title, board_id }, "creating column").await
}

pub async fn update_column(backend: &dyn DataBackend, id: &str, title: &str) -> Result<Column> {
    update(backend, id, &json!({ "title": title }), "updating column").await
}

pub async fn delete_column(backend: &dyn DataBackend, id: &str) -> Result<()> {
    delete::<Column>(backend, id, "deleting column").await
}
