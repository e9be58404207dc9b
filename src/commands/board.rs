//! Board Commands

use serde_json::json;

use super::{delete, get, insert, list, require_title, update};
use crate::backend::{DataBackend, Query};
use crate::error::Result;
use crate::models::{Board, NewBoard};

/// All boards, newest first
pub async fn list_boards(backend: &dyn DataBackend) -> Result<Vec<Board>> {
    list(backend, Query::new().order_by("created_at", false), "fetching boards").await
}

pub async fn get_board(backend: &dyn DataBackend, id: &str) -> Result<Option<Board>> {
    get(backend, id, "fetching board").await
}

pub async fn create_board(backend: &dyn DataBackend, title: &str, owner_id: &str) -> Result<Board> {
    require_title(title)?;
    insert(backend, &NewBoard { title, owner_id }, "creating board").await
}

pub async fn update_board(backend: &dyn DataBackend, id: &str, title: &str) -> Result<Board> {
    update(backend, id, &json!({ "title": title }), "updating board").await
}

pub async fn delete_board(backend: &dyn DataBackend, id: &str) -> Result<()> {
    delete::<Board>(backend, id, "deleting board").await
}
